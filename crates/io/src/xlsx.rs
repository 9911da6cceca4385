// Spreadsheet input (xlsx, xls, xlsb, ods) via calamine.
// Cells are rendered to the text a CSV export of the same sheet would carry.

use std::path::Path;

use biblion_recon::source::clean_header;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};

use crate::error::IoError;

/// Header row plus data rows (1-based row number, rendered cells).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRows {
    pub sheet: String,
    pub headers: Vec<String>,
    pub rows: Vec<(u64, Vec<String>)>,
}

/// Read one worksheet (the named one, or the first). Fully empty rows are skipped.
/// Cells under `isbn_column` are rendered with [`render_isbn_cell`].
pub fn read_rows(path: &Path, sheet: Option<&str>, isbn_column: Option<&str>) -> Result<SheetRows, IoError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IoError::Xlsx(format!("failed to open {}: {e}", path.display())))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| IoError::Xlsx(format!("sheet '{name}' not found in {}", path.display())))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| IoError::Xlsx(format!("{} contains no sheets", path.display())))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::Xlsx(format!("failed to read sheet '{sheet_name}': {e}")))?;

    // Absolute row of the first range row (ranges start at the first used cell)
    let first_row = range.start().map(|(row, _)| u64::from(row)).unwrap_or(0);

    let mut iter = range.rows().enumerate();
    let headers: Vec<String> = match iter.next() {
        Some((_, cells)) => cells.iter().map(render_cell).collect(),
        None => Vec::new(),
    };
    let isbn_idx = isbn_column.and_then(|column| {
        let wanted = clean_header(column);
        headers.iter().position(|h| clean_header(h) == wanted)
    });

    let mut rows = Vec::new();
    for (idx, cells) in iter {
        let rendered: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                if Some(col) == isbn_idx {
                    render_isbn_cell(cell)
                } else {
                    render_cell(cell)
                }
            })
            .collect();
        if rendered.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push((first_row + idx as u64 + 1, rendered));
    }

    Ok(SheetRows {
        sheet: sheet_name,
        headers,
        rows,
    })
}

/// Cell text: integral floats without a fraction, date serials as ISO dates,
/// errors as empty.
pub fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            serial_to_iso(serial).unwrap_or_else(|| format!("{serial}"))
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// ISBN cell text. An ISBN-10 typed in as a number has lost its leading
/// zeros; they are restored to ten digits. Longer numbers render as usual.
pub fn render_isbn_cell(cell: &Data) -> String {
    match *cell {
        Data::Float(n) if n.fract() == 0.0 && (0.0..1e10).contains(&n) => format!("{:010}", n as u64),
        Data::Int(n) if (0..10_000_000_000).contains(&n) => format!("{n:010}"),
        ref other => render_cell(other),
    }
}

/// Excel 1900-system serial -> `YYYY-MM-DD`. The time of day is dropped.
pub fn serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.floor() as i64;
    // Serials below 60 predate the phantom 1900-02-29
    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let date = epoch.checked_add_signed(Duration::days(days))?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    #[test]
    fn serials() {
        assert_eq!(serial_to_iso(1.0).as_deref(), Some("1900-01-01"));
        assert_eq!(serial_to_iso(59.0).as_deref(), Some("1900-02-28"));
        assert_eq!(serial_to_iso(61.0).as_deref(), Some("1900-03-01"));
        assert_eq!(serial_to_iso(38976.0).as_deref(), Some("2006-09-16"));
        assert_eq!(serial_to_iso(38976.75).as_deref(), Some("2006-09-16"));
        assert_eq!(serial_to_iso(0.5), None);
    }

    #[test]
    fn render_scalars() {
        assert_eq!(render_cell(&Data::Float(412.0)), "412");
        assert_eq!(render_cell(&Data::Float(4.25)), "4.25");
        assert_eq!(render_cell(&Data::Int(7)), "7");
        assert_eq!(render_cell(&Data::Bool(false)), "FALSE");
        assert_eq!(render_cell(&Data::Empty), "");
        assert_eq!(render_cell(&Data::DateTimeIso("2006-09-16".into())), "2006-09-16");
    }

    #[test]
    fn reads_named_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("books_data2.xlsx");

        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("notes").unwrap();
        first.write_string(0, 0, "ignored").unwrap();
        let sheet = workbook.add_worksheet();
        sheet.set_name("books").unwrap();
        sheet.write_string(0, 0, "isbn").unwrap();
        sheet.write_string(0, 1, "num_pages").unwrap();
        sheet.write_string(0, 2, "rating").unwrap();
        sheet.write_string(1, 0, "0441013597").unwrap();
        sheet.write_number(1, 1, 412.0).unwrap();
        sheet.write_number(1, 2, 4.25).unwrap();
        sheet.write_string(3, 0, "0618260307").unwrap();
        sheet.write_boolean(3, 1, true).unwrap();
        workbook.save(&path).unwrap();

        let data = read_rows(&path, Some("books"), None).unwrap();
        assert_eq!(data.sheet, "books");
        assert_eq!(data.headers, vec!["isbn", "num_pages", "rating"]);
        // Blank row 3 is skipped; row numbers stay 1-based sheet rows
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0], (2, vec!["0441013597".to_string(), "412".into(), "4.25".into()]));
        assert_eq!(data.rows[1].0, 4);
        assert_eq!(data.rows[1].1[1], "TRUE");

        let first_sheet = read_rows(&path, None, None).unwrap();
        assert_eq!(first_sheet.sheet, "notes");
    }

    #[test]
    fn numeric_isbn_keeps_leading_zero() {
        assert_eq!(render_isbn_cell(&Data::Float(441013597.0)), "0441013597");
        assert_eq!(render_isbn_cell(&Data::Int(2005018)), "0002005018");
        assert_eq!(render_isbn_cell(&Data::Float(9780441013593.0)), "9780441013593");
        assert_eq!(render_isbn_cell(&Data::String("0441013597".into())), "0441013597");

        let dir = tempdir().unwrap();
        let path = dir.path().join("numeric.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "ISBN").unwrap();
        sheet.write_string(0, 1, "pages").unwrap();
        sheet.write_number(1, 0, 441013597.0).unwrap();
        sheet.write_number(1, 1, 412.0).unwrap();
        workbook.save(&path).unwrap();

        let data = read_rows(&path, None, Some("ISBN")).unwrap();
        assert_eq!(data.rows[0].1, vec!["0441013597".to_string(), "412".into()]);
    }

    #[test]
    fn unknown_sheet_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "isbn").unwrap();
        workbook.save(&path).unwrap();

        let err = read_rows(&path, Some("missing"), None).unwrap_err();
        assert!(matches!(err, IoError::Xlsx(_)));
    }
}
