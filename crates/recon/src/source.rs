//! Source adapter parsing: native rows in, [`RawRecord`]s out.
//!
//! Only structural work happens here: header cleanup, column renaming to
//! canonical fields, and skipping rows that do not fit the header. Cell text
//! is passed through untouched. Nothing here fails the run; problems are
//! recorded in [`Diagnostics`] and the affected file or row is skipped.

use crate::config::SourceConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::model::{Field, RawRecord};

/// Header cleanup: trim, drop `"` characters and a UTF-8 BOM.
pub fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .replace('"', "")
}

/// Position of every mapped column in the header row.
fn resolve_columns(source: &SourceConfig, headers: &[String]) -> Result<Vec<(Field, usize)>, String> {
    source
        .column_map()
        .into_iter()
        .map(|(field, column)| {
            let wanted = clean_header(column);
            headers
                .iter()
                .position(|h| *h == wanted)
                .map(|idx| (field, idx))
                .ok_or_else(|| format!("missing column '{column}' (mapped to {field})"))
        })
        .collect()
}

fn build_record<'a>(
    source: &SourceConfig,
    columns: &[(Field, usize)],
    line: u64,
    cell: impl Fn(usize) -> Option<&'a str>,
) -> RawRecord {
    let mut record = RawRecord::new(&source.id, line);
    for &(field, idx) in columns {
        if let Some(value) = cell(idx) {
            record.values.insert(field, value.to_string());
        }
    }
    record
}

fn isbn_cell<'a>(columns: &[(Field, usize)], cell: impl Fn(usize) -> Option<&'a str>) -> Option<&'a str> {
    columns
        .iter()
        .find(|(f, _)| *f == Field::Isbn)
        .and_then(|&(_, idx)| cell(idx))
}

/// Parse delimited text (CSV/TSV/semicolon) per the source's dialect.
pub fn parse_delimited(source: &SourceConfig, data: &str, diags: &mut Diagnostics) -> Vec<RawRecord> {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(true)
        .delimiter(source.delimiter_byte())
        .quote(source.quote as u8);
    if let Some(escape) = source.escape {
        builder.escape(Some(escape as u8));
    }
    let mut reader = builder.from_reader(data.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(clean_header).collect(),
        Err(e) => {
            diags.record(Diagnostic::new(
                DiagnosticKind::SourceLoad,
                &source.id,
                format!("cannot read header: {e}"),
            ));
            return Vec::new();
        }
    };

    let columns = match resolve_columns(source, &headers) {
        Ok(c) => c,
        Err(msg) => {
            diags.record(Diagnostic::new(DiagnosticKind::SourceLoad, &source.id, msg));
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                let mut d = Diagnostic::new(DiagnosticKind::MalformedRow, &source.id, format!("unparsable row: {e}"));
                if let Some(pos) = e.position() {
                    d = d.at_line(pos.line());
                }
                diags.record(d);
                continue;
            }
        };
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        if row.len() != headers.len() {
            diags.record(
                Diagnostic::new(
                    DiagnosticKind::MalformedRow,
                    &source.id,
                    format!("expected {} fields, found {}", headers.len(), row.len()),
                )
                .at_line(line)
                .with_key(isbn_cell(&columns, |i| row.get(i))),
            );
            continue;
        }

        records.push(build_record(source, &columns, line, |i| row.get(i)));
    }

    tracing::debug!(source = %source.id, records = records.len(), "parsed delimited source");
    records
}

/// Build records from already-split rows (spreadsheets). `rows` carry their
/// 1-based row number.
pub fn records_from_rows(
    source: &SourceConfig,
    headers: &[String],
    rows: Vec<(u64, Vec<String>)>,
    diags: &mut Diagnostics,
) -> Vec<RawRecord> {
    let headers: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
    let columns = match resolve_columns(source, &headers) {
        Ok(c) => c,
        Err(msg) => {
            diags.record(Diagnostic::new(DiagnosticKind::SourceLoad, &source.id, msg));
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for (line, cells) in rows {
        let cell = |i: usize| cells.get(i).map(String::as_str);
        if cells.len() != headers.len() {
            diags.record(
                Diagnostic::new(
                    DiagnosticKind::MalformedRow,
                    &source.id,
                    format!("expected {} fields, found {}", headers.len(), cells.len()),
                )
                .at_line(line)
                .with_key(isbn_cell(&columns, cell)),
            );
            continue;
        }
        records.push(build_record(source, &columns, line, cell));
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn bookcrossing() -> SourceConfig {
        let mut source = SourceConfig::canonical("bookcrossing", "books1.csv");
        source.delimiter = ';';
        source.columns = BTreeMap::from([
            ("isbn".to_string(), "ISBN".to_string()),
            ("title".to_string(), "Book-Title".to_string()),
            ("authors".to_string(), "Book-Author".to_string()),
        ]);
        source
    }

    #[test]
    fn renames_columns_and_cleans_quoted_headers() {
        let data = "\u{feff}\"ISBN\";\"Book-Title\";\"Book-Author\";\"Publisher\"\n\
                    \"0195153448\";\"Classical Mythology\";\"Mark P. O. Morford\";\"Oxford\"\n";
        let mut diags = Diagnostics::default();
        let records = parse_delimited(&bookcrossing(), data, &mut diags);

        assert!(diags.is_empty());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.source, "bookcrossing");
        assert_eq!(r.line, 2);
        assert_eq!(r.get(Field::Isbn), Some("0195153448"));
        assert_eq!(r.get(Field::Title), Some("Classical Mythology"));
        // Publisher exists in the file but is not declared, so it is not produced
        assert_eq!(r.get(Field::Publisher), None);
    }

    #[test]
    fn wrong_column_count_skips_row_with_key() {
        let data = "ISBN;Book-Title;Book-Author\n\
                    111;One;A\n\
                    222;Two;B;extra\n\
                    333;Three;C\n";
        let mut diags = Diagnostics::default();
        let records = parse_delimited(&bookcrossing(), data, &mut diags);

        assert_eq!(records.len(), 2);
        assert_eq!(diags.count(DiagnosticKind::MalformedRow), 1);
        let d = &diags.entries()[0];
        assert_eq!(d.key.as_deref(), Some("222"));
        assert_eq!(d.line, Some(3));
    }

    #[test]
    fn missing_declared_column_fails_whole_source() {
        let data = "ISBN;Title\n111;One\n";
        let mut diags = Diagnostics::default();
        let records = parse_delimited(&bookcrossing(), data, &mut diags);
        assert!(records.is_empty());
        assert_eq!(diags.count(DiagnosticKind::SourceLoad), 1);
        assert!(diags.entries()[0].message.contains("Book-Title"));
    }

    #[test]
    fn empty_input_is_a_load_failure_not_a_panic() {
        let mut diags = Diagnostics::default();
        assert!(parse_delimited(&bookcrossing(), "", &mut diags).is_empty());
        assert_eq!(diags.count(DiagnosticKind::SourceLoad), 1);
    }

    #[test]
    fn backslash_escaped_quotes() {
        let mut source = bookcrossing();
        source.escape = Some('\\');
        let data = "ISBN;Book-Title;Book-Author\n\"111\";\"The \\\"Best\\\" Book\";\"A\"\n";
        let mut diags = Diagnostics::default();
        let records = parse_delimited(&source, data, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(records[0].get(Field::Title), Some("The \"Best\" Book"));
    }

    #[test]
    fn rows_from_spreadsheet() {
        let mut source = bookcrossing();
        source.columns.remove("isbn");
        let headers = vec!["Book-Title".to_string(), "Book-Author".to_string()];
        let rows = vec![
            (2, vec!["Dune".to_string(), "Frank Herbert".to_string()]),
            (3, vec!["Short".to_string()]),
        ];
        let mut diags = Diagnostics::default();
        let records = records_from_rows(&source, &headers, rows, &mut diags);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[0].get(Field::Authors), Some("Frank Herbert"));
        assert_eq!(diags.count(DiagnosticKind::MalformedRow), 1);
    }
}
