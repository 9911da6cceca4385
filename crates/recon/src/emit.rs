// Canonical table emitter.
// Fixed column order, minimal quoting, empty string for unknown.

use std::io::Write;

use crate::error::ReconError;
use crate::model::{CanonicalRecord, Field};

/// Output header, in column order.
pub fn header() -> [&'static str; 11] {
    Field::ALL.map(|f| f.column())
}

/// Render one cell. Integers have no fractional part; ratings keep at least one
/// fractional digit; unknown is the empty string.
pub fn cell(record: &CanonicalRecord, field: Field) -> String {
    match field {
        Field::Isbn => record.isbn.clone().unwrap_or_default(),
        Field::Title => record.title.clone().unwrap_or_default(),
        Field::Authors => record.authors.join(", "),
        Field::Language => record.language.clone().unwrap_or_default(),
        Field::NumPages => record.num_pages.map(|n| n.to_string()).unwrap_or_default(),
        Field::PublicationYear => record.publication_year.map(|y| y.to_string()).unwrap_or_default(),
        Field::Publisher => record.publisher.clone().unwrap_or_default(),
        Field::Category => record.category.clone().unwrap_or_default(),
        Field::RatingGoodreads | Field::RatingAmazon | Field::RatingGoogle => {
            record.rating(field).map(format_rating).unwrap_or_default()
        }
    }
}

fn format_rating(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Write the header and one row per record.
pub fn write_records<W: Write>(records: &[CanonicalRecord], writer: W, delimiter: u8) -> Result<(), ReconError> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    out.write_record(header())?;
    for record in records {
        out.write_record(Field::ALL.map(|f| cell(record, f)))?;
    }
    out.flush()?;
    Ok(())
}

/// Emit to an in-memory string.
pub fn to_string(records: &[CanonicalRecord], delimiter: u8) -> Result<String, ReconError> {
    let mut buf = Vec::new();
    write_records(records, &mut buf, delimiter)?;
    // csv only writes the UTF-8 text we hand it
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
