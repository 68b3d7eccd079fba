//! File-backed cache backend
//!
//! The whole key→value map lives in one bincode blob. Every operation runs
//! a full load/mutate/persist cycle under one mutex, and writes replace the
//! file atomically through a temporary file in the same directory.

use crate::cache::CacheResult;
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

/// Local persisted cache without per-entry expiry
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a key; an unreadable file counts as an empty cache
    pub fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let _guard = self.acquire();
        Ok(self.load().remove(key))
    }

    /// Writes a key, replacing any previous value
    pub fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let _guard = self.acquire();
        let mut entries = self.load();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load(&self) -> HashMap<String, String> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cache file unreadable, treating as empty");
                return HashMap::new();
            }
        };

        match bincode::deserialize(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cache file corrupt, treating as empty");
                HashMap::new()
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> CacheResult<()> {
        let bytes = bincode::serialize(entries)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}
