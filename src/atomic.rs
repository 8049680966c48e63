//! Write-then-rename helpers so a failed write never leaves a partial file at
//! the destination path.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Create a temporary file next to `dest` (same filesystem, so the final
/// rename is atomic).
pub(crate) fn stage(dest: &Path) -> io::Result<NamedTempFile> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tempfile::Builder::new()
        .prefix(".imageprep-")
        .suffix(".tmp")
        .tempfile_in(dir)
}

/// Move a staged file over `dest`, replacing any existing file.
pub(crate) fn commit(staged: NamedTempFile, dest: &Path) -> io::Result<()> {
    staged.persist(dest).map(|_| ()).map_err(|e| e.error)
}

/// Replace `dest` with `bytes`.
pub(crate) fn write_bytes(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut staged = stage(dest)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    commit(staged, dest)
}
