//! Where document text comes from and goes to.
//!
//! The parser needs the complete text before it starts, and the serializer
//! produces the complete text in one piece, so both seams deal in whole
//! strings.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use supercsv::{parse, serialize_with, Document, SerializeOptions};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Supplies the full text of a document.
pub trait TextSource {
    fn read_text(&self) -> Result<String>;
}

/// Accepts the full serialized text of a document.
pub trait TextSink {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

impl TextSource for str {
    fn read_text(&self) -> Result<String> {
        Ok(self.to_string())
    }
}

impl TextSource for String {
    fn read_text(&self) -> Result<String> {
        Ok(self.clone())
    }
}

/// Replaces the buffer contents.
impl TextSink for String {
    fn write_text(&mut self, text: &str) -> Result<()> {
        self.clear();
        self.push_str(text);
        Ok(())
    }
}

/// Reads a document file from disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSource for FileSource {
    fn read_text(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))
    }
}

/// Writes a document file atomically: temp file in the same directory, then
/// rename over the target.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let unique_id = format!(
            "{}.{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        );
        parent.join(format!(".{}.{}.tmp", name, unique_id))
    }
}

impl TextSink for FileSink {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let temp_path = self.temp_path();

        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(text.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(&self.path, e));
        }

        debug!("Wrote {} bytes to {}", text.len(), self.path.display());
        Ok(())
    }
}

/// Read and parse a document from any source.
pub fn read_document<S: TextSource + ?Sized>(source: &S) -> Result<Document> {
    let text = source.read_text()?;
    Ok(parse(&text)?)
}

/// Serialize a document into any sink.
pub fn write_document<W: TextSink + ?Sized>(
    doc: &Document,
    sink: &mut W,
    options: &SerializeOptions,
) -> Result<()> {
    sink.write_text(&serialize_with(doc, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PEOPLE: &str = "name: string\nage: int\n@@\nname,age\nJohn,27\n";

    #[test]
    fn test_string_source_and_sink() {
        let doc = read_document(PEOPLE).unwrap();
        assert_eq!(doc.len(), 1);

        let mut buffer = String::from("stale contents");
        write_document(&doc, &mut buffer, &SerializeOptions::default()).unwrap();
        assert_eq!(
            buffer,
            "name: string\nage: integer\n\n@@\n\nname,age\nJohn,27\n"
        );
        assert_eq!(read_document(&buffer).unwrap(), doc);
    }

    #[test]
    fn test_parse_errors_pass_through() {
        let err = read_document("name: string\nname\nJohn\n").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Scsv(supercsv::ScsvError::MissingSeparator(_))
        ));
    }

    #[test]
    fn test_file_sink_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("people.scsv");
        fs::write(&path, "old").unwrap();

        let mut sink = FileSink::new(&path);
        sink.write_text(PEOPLE).unwrap();

        assert_eq!(FileSource::new(&path).read_text().unwrap(), PEOPLE);
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.scsv");
        let err = FileSource::new(&path).read_text().unwrap_err();
        assert!(matches!(err, StoreError::Io { path: p, .. } if p == path));
    }
}
