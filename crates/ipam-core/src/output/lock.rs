// # Exclusive File Lock
//
// Scoped advisory lock. The lock is taken on open and released when the
// guard is dropped, whichever way the holder exits.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::Error;

/// Exclusive advisory lock on a file, released on drop
#[derive(Debug)]
pub struct ExclusiveLock {
    path: PathBuf,
    file: File,
}

impl ExclusiveLock {
    /// Open (creating if needed) and exclusively lock `path`
    ///
    /// Blocks until the lock is granted. The file content is left untouched.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::lock(&path, e))?;

        FileExt::lock_exclusive(&file).map_err(|e| Error::lock(&path, e))?;
        tracing::trace!("Locked {}", path.display());

        Ok(Self { path, file })
    }

    /// Locked path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle on the locked file
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        } else {
            tracing::trace!("Unlocked {}", self.path.display());
        }
    }
}
