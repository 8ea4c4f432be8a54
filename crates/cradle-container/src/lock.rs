//! File-backed advisory locking, one lock file per container.
//!
//! The lock uses `flock(2)`, so exclusion holds across process boundaries
//! as well as threads — required because multiple CLI invocations may race
//! on the same container. Every acquisition opens its own file
//! description, and the guard releases the lock on drop, on every exit
//! path.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// A named, exclusive, file-backed lock.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Creates the lock file at `path` if it does not already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let _ = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { path })
    }

    /// Blocks until the exclusive lock is held.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be opened or the
    /// `flock(2)` syscall fails.
    pub fn acquire(&self) -> io::Result<LockGuard> {
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        flock(&file, libc::LOCK_EX)?;
        Ok(LockGuard { file })
    }

    /// Attempts to take the exclusive lock without blocking.
    ///
    /// Returns `None` when another holder currently has the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be opened or the
    /// `flock(2)` syscall fails for a reason other than contention.
    pub fn try_acquire(&self) -> io::Result<Option<LockGuard>> {
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        match flock(&file, libc::LOCK_EX | libc::LOCK_NB) {
            Ok(()) => Ok(Some(LockGuard { file })),
            Err(e) if e.raw_os_error() == Some(libc::EWOULDBLOCK) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Path of the lock file on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Holds the exclusive lock; released when dropped.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the descriptor would release the lock as well; the
        // explicit unlock keeps release immediate.
        let _ = flock(&self.file, libc::LOCK_UN);
    }
}

fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    // SAFETY: flock only reads the descriptor, which stays open for the
    // lifetime of `file`.
    let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
