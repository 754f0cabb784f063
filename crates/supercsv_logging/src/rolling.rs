//! Size-rotated log file writer.
//!
//! Writes go to `<dir>/<name>.log`. Once a write would push that file past
//! `max_size` bytes, it is shifted to `<name>.log.1`, older files move up by
//! one and anything beyond `keep` rotated files is deleted.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rotation {
    /// Size limit of the live file in bytes.
    pub max_size: u64,
    /// Rotated files kept besides the live one.
    pub keep: usize,
}

pub(crate) struct RollingFile {
    dir: PathBuf,
    name: String,
    rotation: Rotation,
    file: File,
    size: u64,
}

impl RollingFile {
    pub(crate) fn open(dir: &Path, name: &str, rotation: Rotation) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let name = file_stem_for(name);
        let (file, size) = open_append(&dir.join(format!("{}.log", name)))?;
        let mut rolling = Self {
            dir: dir.to_path_buf(),
            name,
            rotation,
            file,
            size,
        };
        if rolling.size > rolling.rotation.max_size {
            rolling.roll()?;
        }
        Ok(rolling)
    }

    pub(crate) fn live_path(&self) -> PathBuf {
        self.numbered(0)
    }

    /// `0` is the live file, `n` the n-th most recent rotated one.
    fn numbered(&self, n: usize) -> PathBuf {
        if n == 0 {
            self.dir.join(format!("{}.log", self.name))
        } else {
            self.dir.join(format!("{}.log.{}", self.name, n))
        }
    }

    fn roll(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.rotation.keep == 0 {
            fs::remove_file(self.live_path())?;
        } else {
            let oldest = self.numbered(self.rotation.keep);
            if oldest.exists() {
                fs::remove_file(oldest)?;
            }
            for n in (0..self.rotation.keep).rev() {
                let from = self.numbered(n);
                if from.exists() {
                    fs::rename(from, self.numbered(n + 1))?;
                }
            }
        }

        let (file, size) = open_append(&self.live_path())?;
        self.file = file;
        self.size = size;
        Ok(())
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size > 0 && self.size + buf.len() as u64 > self.rotation.max_size {
            self.roll()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

fn file_stem_for(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => ch,
            _ => '_',
        })
        .collect();
    if stem.is_empty() {
        "supercsv".to_string()
    } else {
        stem
    }
}

/// [`MakeWriter`] handing out handles to one shared [`RollingFile`].
#[derive(Clone)]
pub(crate) struct SharedRollingFile(Arc<Mutex<RollingFile>>);

impl SharedRollingFile {
    pub(crate) fn new(file: RollingFile) -> Self {
        Self(Arc::new(Mutex::new(file)))
    }
}

pub(crate) struct RollingHandle(Arc<Mutex<RollingFile>>);

impl RollingHandle {
    fn with_file<T>(&self, f: impl FnOnce(&mut RollingFile) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        f(&mut file)
    }
}

impl Write for RollingHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

impl<'a> MakeWriter<'a> for SharedRollingFile {
    type Writer = RollingHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RollingHandle(Arc::clone(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rotation(max_size: u64, keep: usize) -> Rotation {
        Rotation { max_size, keep }
    }

    #[test]
    fn test_file_stem_for() {
        assert_eq!(file_stem_for("scsv-tool"), "scsv-tool");
        assert_eq!(file_stem_for("my app/v1"), "my_app_v1");
        assert_eq!(file_stem_for(""), "supercsv");
    }

    #[test]
    fn test_appends_until_limit() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = RollingFile::open(temp_dir.path(), "app", rotation(64, 2)).unwrap();

        log.write_all(b"first\n").unwrap();
        log.write_all(b"second\n").unwrap();
        log.flush().unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("app.log")).unwrap(),
            "first\nsecond\n"
        );
        assert!(!temp_dir.path().join("app.log.1").exists());
    }

    #[test]
    fn test_rotates_and_prunes() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = RollingFile::open(temp_dir.path(), "app", rotation(10, 2)).unwrap();

        for line in ["aaaaaaaa\n", "bbbbbbbb\n", "cccccccc\n", "dddddddd\n"] {
            log.write_all(line.as_bytes()).unwrap();
        }
        log.flush().unwrap();

        let read = |name: &str| fs::read_to_string(temp_dir.path().join(name)).unwrap();
        assert_eq!(read("app.log"), "dddddddd\n");
        assert_eq!(read("app.log.1"), "cccccccc\n");
        assert_eq!(read("app.log.2"), "bbbbbbbb\n");
        assert!(!temp_dir.path().join("app.log.3").exists());
    }

    #[test]
    fn test_oversized_existing_file_rolls_on_open() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("app.log"), "x".repeat(32)).unwrap();

        let log = RollingFile::open(temp_dir.path(), "app", rotation(16, 1)).unwrap();
        assert_eq!(fs::metadata(log.live_path()).unwrap().len(), 0);
        assert!(temp_dir.path().join("app.log.1").exists());
    }

    #[test]
    fn test_shared_handles_write_to_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let log = RollingFile::open(temp_dir.path(), "app", rotation(1024, 1)).unwrap();
        let shared = SharedRollingFile::new(log);

        shared.make_writer().write_all(b"one\n").unwrap();
        shared.make_writer().write_all(b"two\n").unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("app.log")).unwrap(),
            "one\ntwo\n"
        );
    }
}
