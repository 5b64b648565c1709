//! Advisory whole-file locks on the catalog.
//!
//! Locks are `flock(2)` locks, which belong to the open file description:
//! two independent opens of the catalog contend even inside one process.

use std::{fs::File, path::Path};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Held lock, released on drop.
#[derive(Debug)]
pub struct CatalogLock<'a> {
    file: &'a File,
    mode: LockMode,
}

impl<'a> CatalogLock<'a> {
    /// Blocks until the lock is granted.
    pub fn acquire(file: &'a File, mode: LockMode, path: &Path) -> Result<Self> {
        sys::lock(file, mode, path)?;
        tracing::trace!(path = %path.display(), ?mode, "catalog lock acquired");
        Ok(Self { file, mode })
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for CatalogLock<'_> {
    fn drop(&mut self) {
        sys::unlock(self.file);
    }
}

#[cfg(unix)]
mod sys {
    use std::{fs::File, io, os::unix::io::AsRawFd, path::Path};

    use super::LockMode;
    use crate::error::{IoResultExt, Result};

    pub fn lock(file: &File, mode: LockMode, path: &Path) -> Result<()> {
        let op = match mode {
            LockMode::Shared => libc::LOCK_SH,
            LockMode::Exclusive => libc::LOCK_EX,
        };
        loop {
            // SAFETY: the fd is borrowed from `file`, which outlives this call.
            let rc = unsafe { libc::flock(file.as_raw_fd(), op) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err).with_context(|| format!("locking {}", path.display()));
            }
        }
    }

    pub fn unlock(file: &File) {
        // Closing the descriptor releases the lock as well.
        // SAFETY: the fd is borrowed from `file`, which outlives this call.
        let _ = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    }
}

#[cfg(not(unix))]
mod sys {
    use std::{fs::File, path::Path};

    use super::LockMode;
    use crate::error::Result;

    pub fn lock(_file: &File, _mode: LockMode, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "catalog locking is not supported on this platform");
        Ok(())
    }

    pub fn unlock(_file: &File) {}
}
