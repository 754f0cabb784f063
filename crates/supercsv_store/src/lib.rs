//! File-backed SuperCSV documents.
//!
//! Binds a [`supercsv::Document`] to a `.scsv` file. Saves are atomic
//! (temp file plus rename) and serialized across processes by an `fs2`
//! lock on `<file>.lock`.
//!
//! ```no_run
//! use supercsv_store::use_file;
//!
//! let mut people = use_file("people.scsv")?;
//! people.update_field(0, "age", 28)?;
//! # Ok::<(), supercsv_store::StoreError>(())
//! ```

pub mod config;
pub mod error;
pub mod file_document;
pub mod lock;
pub mod source;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use file_document::FileDocument;
pub use lock::{lock_exclusive, lock_path_for, FileLockGuard, LockMode};
pub use source::{read_document, write_document, FileSink, FileSource, TextSink, TextSource};

use std::path::PathBuf;
use supercsv::Document;

/// Parse SCSV text held in memory.
pub fn parse_string(text: &str) -> supercsv::Result<Document> {
    supercsv::parse(text)
}

/// Open a file with the default store settings (autosave, blocking lock).
pub fn use_file(path: impl Into<PathBuf>) -> Result<FileDocument> {
    FileDocument::open(StoreConfig::new(path))
}
