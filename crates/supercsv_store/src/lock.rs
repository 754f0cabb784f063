//! Process-level document locking.
//!
//! Saves are serialized across processes with an exclusive lock on a sidecar
//! `<file>.lock` file. The document file itself is never locked because it is
//! replaced by rename on every save.
//!
//! Uses the `fs2` crate for cross-platform file locking (MSRV 1.75 compatible).

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// How to behave when another process holds the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Wait until the lock is released.
    #[default]
    Blocking,
    /// Fail immediately with [`StoreError::Locked`].
    Try,
}

/// Holds an exclusive lock on a document's lock file.
///
/// The lock is released when the guard is dropped.
pub struct FileLockGuard {
    _file: File,
    lock_path: PathBuf,
}

impl FileLockGuard {
    /// Get the path to the lock file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        // Closing the file releases the flock/LockFileEx lock.
        debug!("Releasing document lock: {}", self.lock_path.display());
    }
}

impl std::fmt::Debug for FileLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLockGuard")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

/// Get the lock file path for a document path.
///
/// Examples:
/// - `/data/people.scsv` → `/data/people.scsv.lock`
/// - `/data/people` → `/data/people.lock`
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Acquire an exclusive lock on a document file.
///
/// `path` is the document file, not the lock file.
pub fn lock_exclusive(path: &Path, mode: LockMode) -> Result<FileLockGuard> {
    let lock_path = lock_path_for(path);

    debug!(
        "Acquiring exclusive lock ({:?}): {}",
        mode,
        lock_path.display()
    );

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| StoreError::lock_failed(&lock_path, e))?;

    // Fully qualified calls: std::fs::File gained inherent lock methods in
    // Rust 1.89 with different error types.
    match mode {
        LockMode::Blocking => {
            FileExt::lock_exclusive(&file).map_err(|e| StoreError::lock_failed(&lock_path, e))?
        }
        LockMode::Try => match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!("Document is locked by another process");
                return Err(StoreError::Locked(path.to_path_buf()));
            }
            Err(e) => return Err(StoreError::lock_failed(&lock_path, e)),
        },
    }

    info!("Acquired document lock: {}", lock_path.display());
    Ok(FileLockGuard {
        _file: file,
        lock_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_for() {
        assert_eq!(
            lock_path_for(Path::new("/data/people.scsv")),
            PathBuf::from("/data/people.scsv.lock")
        );
        assert_eq!(
            lock_path_for(Path::new("/data/people")),
            PathBuf::from("/data/people.lock")
        );
        assert_eq!(
            lock_path_for(Path::new("/data/my.data.scsv")),
            PathBuf::from("/data/my.data.scsv.lock")
        );
    }

    #[test]
    fn test_lock_and_release() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("people.scsv");

        let guard = lock_exclusive(&path, LockMode::Try).unwrap();
        assert!(guard.lock_path().exists());
        drop(guard);

        let _again = lock_exclusive(&path, LockMode::Try).unwrap();
    }

    #[test]
    fn test_lock_contention() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("people.scsv");

        let _guard = lock_exclusive(&path, LockMode::Blocking).unwrap();

        let result = lock_exclusive(&path, LockMode::Try);
        assert!(matches!(result, Err(StoreError::Locked(p)) if p == path));
    }

    #[test]
    fn test_lock_mode_serde() {
        let mode: LockMode = serde_json::from_str("\"try\"").unwrap();
        assert_eq!(mode, LockMode::Try);
        assert_eq!(LockMode::default(), LockMode::Blocking);
    }
}
