//! Cross-process advisory lock over the data directory.
//!
//! The in-process mutex in [`crate::desk::OrderDesk`] serialises commands
//! within one process. Two `od` invocations racing on the same data directory
//! are serialised by an exclusive `flock` on `<data>/.lock` instead.

use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

/// File name of the lock inside the data directory.
pub const LOCK_FILE: &str = ".lock";

const RETRY_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("data directory lock timed out after {waited:?} at {}", path.display())]
    Timeout { path: PathBuf, waited: Duration },
    #[error("lock file: {0}")]
    Io(#[from] io::Error),
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::Io(_) => ErrorCode::StorageWriteFailed,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Exclusive lock on a data directory, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Lock `<data_dir>/.lock`, retrying until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] if another process holds the lock for
    /// longer than `timeout`, or [`LockError::Io`] if the lock file cannot be
    /// created.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(LOCK_FILE);

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;

            if file.try_lock_exclusive().is_ok() {
                tracing::debug!(path = %path.display(), "data directory locked");
                return Ok(Self { file, path });
            }

            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path,
                    waited: start.elapsed(),
                });
            }
            thread::sleep(RETRY_DELAY);
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_lock_file() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        let lock = StoreLock::acquire(dir.path(), Duration::from_millis(50))?;
        assert_eq!(lock.path(), dir.path().join(LOCK_FILE));
        assert!(lock.path().exists());
        lock.release();
        Ok(())
    }

    #[test]
    fn second_holder_times_out() {
        let dir = TempDir::new().expect("tempdir");
        let _held = StoreLock::acquire(dir.path(), Duration::from_millis(50)).expect("first");
        let err = StoreLock::acquire(dir.path(), Duration::from_millis(20)).expect_err("held");

        assert!(matches!(err, LockError::Timeout { .. }));
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.hint().is_some());
        assert!(err.to_string().starts_with("data directory lock timed out"));
        assert!(!err.to_string().contains("E5002"));
    }

    #[test]
    fn released_lock_can_be_reacquired() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        {
            let _first = StoreLock::acquire(dir.path(), Duration::from_millis(50))?;
        }
        let _second = StoreLock::acquire(dir.path(), Duration::from_millis(50))?;
        Ok(())
    }

    #[test]
    fn waiter_proceeds_once_holder_releases() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        let held = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let path = dir.path().to_path_buf();
        let (held_in_thread, release_in_thread) = (Arc::clone(&held), Arc::clone(&release));
        let holder = thread::spawn(move || {
            let _lock = StoreLock::acquire(&path, Duration::from_millis(200)).expect("holder");
            held_in_thread.wait();
            release_in_thread.wait();
        });

        held.wait();
        assert!(StoreLock::acquire(dir.path(), Duration::from_millis(20)).is_err());
        release.wait();
        holder.join().expect("holder thread");

        let _follow_up = StoreLock::acquire(dir.path(), Duration::from_millis(200))?;
        Ok(())
    }
}
