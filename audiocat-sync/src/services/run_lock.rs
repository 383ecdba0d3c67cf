//! Single-run guard
//!
//! An exclusive OS advisory lock on a sibling `<catalog>.lock` file marks a
//! run in progress. The operating system releases it when the holder exits,
//! however it exits, so a killed run never blocks the next one. The file
//! itself stays behind and records the pid of the last holder.

use crate::error::{SyncError, SyncResult};
use std::fs::{File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Held for the duration of a run
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}

impl RunLock {
    /// `<catalog>.lock` next to the catalog file
    pub fn path_for(catalog: &Path) -> PathBuf {
        let mut name = catalog.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock or fail with [`SyncError::Locked`]
    ///
    /// A leftover file from a dead process carries no lock and is reused.
    pub fn acquire(catalog: &Path) -> SyncResult<Self> {
        let path = Self::path_for(catalog);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(SyncError::Locked(path)),
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        tracing::debug!(lock = %path.display(), "Run lock acquired");

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well
        if let Err(e) = self.file.unlock() {
            tracing::warn!(lock = %self.path.display(), "Failed to release run lock: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("catalog.db");

        let lock = RunLock::acquire(&catalog).unwrap();
        assert_eq!(lock.path(), dir.path().join("catalog.db.lock"));
        assert!(matches!(RunLock::acquire(&catalog), Err(SyncError::Locked(_))));

        drop(lock);
        assert!(RunLock::acquire(&catalog).is_ok());
    }

    #[test]
    fn test_lock_records_pid() {
        let dir = tempfile::tempdir().unwrap();
        let lock = RunLock::acquire(&dir.path().join("c.db")).unwrap();

        let content = std::fs::read_to_string(lock.path()).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_leftover_file_without_holder_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("c.db");
        // Longer than a pid so truncation is visible
        std::fs::write(RunLock::path_for(&catalog), "4194304999\n").unwrap();

        let lock = RunLock::acquire(&catalog).unwrap();
        let content = std::fs::read_to_string(lock.path()).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());
    }
}
