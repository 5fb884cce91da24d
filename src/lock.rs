//! Single-instance guard for a payroll store.
//!
//! Two runs over the same store would both pick up the same outstanding payments and could pay
//! them twice, so every run holds an exclusive lock file for its whole duration.

use fs2::FileExt;
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Errors from acquiring the [`RunLock`].
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock file could not be created or written.
    #[error("failed to create lock file {path}: {source}")]
    Io {
        /// Path of the lock file.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Another process holds the lock.
    #[error(
        "payroll store already in use{} ({})",
        .pid.map(|pid| format!(" by process {pid}")).unwrap_or_default(),
        .path.display()
    )]
    AlreadyLocked {
        /// PID written by the holder, if readable.
        pid: Option<u32>,
        /// Path of the lock file.
        path: PathBuf,
    },
}

/// Exclusive lock held for the duration of a run, released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Acquires the lock at `path` without blocking.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| LockError::Io { path: path.clone(), source };

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io_err)?;

        if file.try_lock_exclusive().is_err() {
            let pid = std::fs::read_to_string(&path).ok().and_then(|s| s.trim().parse().ok());
            return Err(LockError::AlreadyLocked { pid, path });
        }

        file.set_len(0).map_err(io_err)?;
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        debug!(path = %path.display(), "Acquired run lock");
        Ok(Self { file, path })
    }

    /// Returns the lock file path for a database URL such as `sqlite://payroll.db?mode=rwc`.
    ///
    /// In-memory databases get a lock in the working directory.
    pub fn path_for_database(url: &str) -> PathBuf {
        let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
        let path = path.split('?').next().unwrap_or_default();
        if path.is_empty() || path == ":memory:" {
            PathBuf::from("payroll.lock")
        } else {
            PathBuf::from(format!("{path}.lock"))
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}
