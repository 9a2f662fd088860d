use std::io::Write;
use std::path::Path;

use log::info;
use tempfile::NamedTempFile;

use crate::Error;

pub(crate) fn read(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces `path` with `bytes` in one step.
///
/// The data is staged in a temporary file next to the destination, synced and
/// then renamed over it, so a failed write never leaves a partial file behind.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let write_error = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let folder = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(folder).map_err(write_error)?;
    // The staged file is private; an existing destination keeps its mode.
    if let Ok(metadata) = std::fs::metadata(path) {
        staged
            .as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_error)?;
    }
    staged.write_all(bytes).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    staged.persist(path).map_err(|err| write_error(err.error))?;

    info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
