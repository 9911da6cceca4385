// Canonical table artifact on disk.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use biblion_recon::emit;
use biblion_recon::model::CanonicalRecord;

use crate::error::IoError;

/// Write the canonical table, creating parent directories. An empty record
/// set still produces the header row.
pub fn write_artifact(path: &Path, records: &[CanonicalRecord], delimiter: u8) -> Result<(), IoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| IoError::io(path, e))?;
    emit::write_records(records, BufWriter::new(file), delimiter)?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote artifact");
    Ok(())
}
