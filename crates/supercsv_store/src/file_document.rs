//! A document bound to a file on disk.
//!
//! Reads go to the in-memory [`Document`]. With autosave on, a mutation is
//! applied to a copy, the copy is saved, and only then does it replace the
//! in-memory document. A mutation that fails, including its save, leaves both
//! the document and the file untouched. Saves hold the exclusive lock for the
//! duration of the write and replace the file atomically.

use std::path::Path;
use supercsv::{Document, FieldValue, Row, RowInput, Schema};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::lock::lock_exclusive;
use crate::source::{read_document, write_document, FileSink, FileSource};

#[derive(Debug)]
pub struct FileDocument {
    config: StoreConfig,
    document: Document,
}

impl FileDocument {
    /// Read and parse an existing file.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let document = read_document(&FileSource::new(&config.path))?;
        info!(
            "Opened {} ({} columns, {} rows)",
            config.path.display(),
            document.schema().len(),
            document.len()
        );
        Ok(Self { config, document })
    }

    /// Start an empty document with the given schema and write it out
    /// immediately, replacing any existing file.
    pub fn create(config: StoreConfig, schema: Schema) -> Result<Self> {
        let file = Self {
            config,
            document: Document::new(schema),
        };
        file.save()?;
        info!("Created {}", file.path().display());
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Row> {
        Ok(self.document.get(index)?)
    }

    pub fn read_all(&self) -> std::slice::Iter<'_, Row> {
        self.document.read_all()
    }

    pub fn update_row(&mut self, index: usize, input: impl Into<RowInput>) -> Result<()> {
        self.apply(|doc| doc.update_row(index, input))
    }

    pub fn set(&mut self, index: usize, input: impl Into<RowInput>) -> Result<()> {
        self.apply(|doc| doc.set(index, input))
    }

    pub fn update_field(
        &mut self,
        index: usize,
        column: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        self.apply(|doc| doc.update_field(index, column, value))
    }

    pub fn insert_row(&mut self, input: impl Into<RowInput>) -> Result<()> {
        self.apply(|doc| doc.insert_row(input))
    }

    pub fn remove_row(&mut self, index: usize) -> Result<Row> {
        self.apply(|doc| doc.remove_row(index))
    }

    /// Write the document to its file under the exclusive lock.
    pub fn save(&self) -> Result<()> {
        self.write(&self.document)
    }

    /// Re-read the file. On failure the in-memory document is kept.
    pub fn reload(&mut self) -> Result<()> {
        self.document = read_document(&FileSource::new(&self.config.path))?;
        debug!(
            "Reloaded {} ({} rows)",
            self.config.path.display(),
            self.document.len()
        );
        Ok(())
    }

    /// Run `change` and, with autosave on, persist the result before
    /// committing it.
    fn apply<T>(
        &mut self,
        change: impl FnOnce(&mut Document) -> supercsv::Result<T>,
    ) -> Result<T> {
        if !self.config.autosave {
            return Ok(change(&mut self.document)?);
        }

        let mut candidate = self.document.clone();
        let out = change(&mut candidate)?;
        self.write(&candidate)?;
        self.document = candidate;
        Ok(out)
    }

    fn write(&self, document: &Document) -> Result<()> {
        let _guard = lock_exclusive(&self.config.path, self.config.lock)?;
        write_document(
            document,
            &mut FileSink::new(&self.config.path),
            &self.config.serialize,
        )?;
        debug!(
            "Saved {} rows to {}",
            document.len(),
            self.config.path.display()
        );
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FileDocument {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.read_all()
    }
}
