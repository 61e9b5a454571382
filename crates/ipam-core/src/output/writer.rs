// # Artifact Writer
//
// Writes a rendered artifact in place under an exclusive lock on the file
// itself. Readers honouring the lock never observe a half-written file.

use std::io::Write;
use std::path::Path;

use crate::Error;
use crate::output::lock::ExclusiveLock;

/// Replace the content of `path` with `contents` while holding its lock
///
/// Parent directories are created as needed.
pub fn write_locked(path: &Path, contents: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut lock = ExclusiveLock::acquire(path)?;
    let file = lock.file_mut();
    file.set_len(0)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    tracing::debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
