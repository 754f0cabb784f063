//! Error types for the file store.

use std::io;
use std::path::PathBuf;
use supercsv::ScsvError;
use thiserror::Error;

/// Store operation result type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the document file failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another process holds the lock and the lock mode is non-blocking
    #[error("File is locked by another process: {0}")]
    Locked(PathBuf),

    /// The lock file could not be created or locked
    #[error("Failed to acquire lock {path}: {source}")]
    LockFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document itself was rejected
    #[error(transparent)]
    Scsv(#[from] ScsvError),
}

impl StoreError {
    /// Create an IO error tagged with the file it concerns.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a lock acquisition error.
    pub fn lock_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LockFailed {
            path: path.into(),
            source,
        }
    }
}
