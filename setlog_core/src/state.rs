//! The performance book on disk.
//!
//! `performance.json` is only ever replaced whole (temp file + rename), so a
//! reader sees either the old book or the new one and needs no lock.
//! Read-modify-write cycles from different processes are serialized on a
//! sibling `.lock` file.

use crate::wal::FileLock;
use crate::{Error, PerformanceBook, Result};
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl PerformanceBook {
    /// Read the book at `path`
    ///
    /// A missing file is an empty book. An unreadable or corrupt one is
    /// logged and also read as empty: prefill hints are not worth failing a
    /// session over.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No performance book at {:?}", path);
                return Self::default();
            }
            Err(e) => {
                tracing::warn!("Cannot read performance book {:?}: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str::<PerformanceBook>(&contents) {
            Ok(book) => {
                tracing::debug!("{} performance records in {:?}", book.records.len(), path);
                book
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt performance book {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Replace the book at `path` atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;

        let temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} performance records to {:?}", self.records.len(), path);
        Ok(())
    }

    /// Load, modify and save the book while holding its lock file
    ///
    /// Returns the book as saved.
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut PerformanceBook) -> Result<()>,
    {
        let lock_path = path.with_extension("lock");
        if let Some(dir) = lock_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        let _lock = FileLock::exclusive(&lock_file)?;

        let mut book = Self::load(path);
        f(&mut book)?;
        book.save(path)?;
        Ok(book)
    }
}
