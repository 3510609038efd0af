//! CSV tables of parsed and merged rows.

use std::path::Path;

use tracing::debug;

use crate::domain::Record;

use super::error::StoreError;

/// Write `rows` to `path`, replacing any existing file.
///
/// The header is always written from [`Record::COLUMNS`], so an empty table
/// still carries the full column set. Parent directories are created.
pub fn write_rows<R: Record>(path: &Path, rows: &[R]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| StoreError::csv(path, e))?;

    writer
        .write_record(R::COLUMNS)
        .map_err(|e| StoreError::csv(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| StoreError::csv(path, e))?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))?;

    debug!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

/// Read a table written by [`write_rows`].
///
/// A missing file fails with [`StoreError::MissingInput`] naming `step`,
/// the command that produces it.
pub fn read_rows<R: Record>(path: &Path, step: &'static str) -> Result<Vec<R>, StoreError> {
    if !path.is_file() {
        return Err(StoreError::MissingInput {
            path: path.to_path_buf(),
            step,
        });
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<R>, _>>()
        .map_err(|e| StoreError::csv(path, e))?;

    debug!(path = %path.display(), rows = rows.len(), "read table");
    Ok(rows)
}
