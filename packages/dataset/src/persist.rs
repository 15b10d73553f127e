//! Crash-safe file replacement.
//!
//! Content is written to a temporary file in the target directory and
//! renamed over the destination, so readers only ever see the old file or
//! the complete new one.

use std::fs::File;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{DatasetError, paths};

/// Writes `path` atomically using `write` to produce the content.
///
/// # Errors
///
/// Returns [`DatasetError`] if the parent directory cannot be created, the
/// writer fails, or the final rename fails. On error the destination is
/// untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), DatasetError>
where
    F: FnOnce(&mut File) -> Result<(), DatasetError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    paths::ensure_dir(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| DatasetError::Io(e.error))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}
