//! Source adapters over files: read, parse, never fail the run.

use std::path::{Path, PathBuf};

use biblion_recon::config::{ReconConfig, SourceConfig, SourceFormat};
use biblion_recon::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use biblion_recon::model::{Field, RawRecord, ReconInput};
use biblion_recon::source::{parse_delimited, records_from_rows};

use crate::error::IoError;

/// Resolve a config-relative path.
pub fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn read(path: &Path, source: &SourceConfig, diags: &mut Diagnostics) -> Result<Vec<RawRecord>, IoError> {
    match source.format() {
        SourceFormat::Csv => {
            let data = crate::csv::read_file_as_utf8(path)?;
            Ok(parse_delimited(source, &data, diags))
        }
        SourceFormat::Xlsx => {
            let isbn_column = source
                .column_map()
                .into_iter()
                .find_map(|(field, column)| (field == Field::Isbn).then_some(column));
            let sheet = crate::xlsx::read_rows(path, source.sheet.as_deref(), isbn_column)?;
            Ok(records_from_rows(source, &sheet.headers, sheet.rows, diags))
        }
    }
}

/// Load one source. An unreadable file is a `source_load` diagnostic and an
/// empty contribution.
pub fn load_source(base_dir: &Path, source: &SourceConfig, diags: &mut Diagnostics) -> Vec<RawRecord> {
    let path = resolve(base_dir, &source.file);
    match read(&path, source, diags) {
        Ok(records) => {
            tracing::info!(source = %source.id, path = %path.display(), records = records.len(), "loaded source");
            records
        }
        Err(e) => {
            diags.record(Diagnostic::new(DiagnosticKind::SourceLoad, &source.id, e.to_string()));
            Vec::new()
        }
    }
}

/// Load every declared source into engine input.
pub fn load_all(base_dir: &Path, config: &ReconConfig) -> ReconInput {
    let mut input = ReconInput::default();
    for source in &config.sources {
        let records = load_source(base_dir, source, &mut input.diagnostics);
        input.records.insert(source.id.clone(), records);
    }
    input
}
