//! File-backed key-value store.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "notifications": "[...]",
//!     "lastNotificationCheck": "\"2026-03-01T10:00:00Z\""
//!   }
//! }
//! ```
//!
//! Every operation re-reads the file so separate processes (the CLI and a
//! long-running watcher) observe each other's writes.
//!
//! # Defensive Design
//!
//! - Missing or empty file: empty store
//! - Corrupt JSON or unknown version: empty store, warning logged
//! - Writes go through temp file + rename so readers never see a partial file

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use super::KvStore;
use crate::error::{AlertsError, Result};

const FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

impl Default for StoreFile {
    fn default() -> Self {
        StoreFile {
            version: FILE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    // Serializes this process's read-modify-write cycles on the file.
    io_lock: Mutex<()>,
}

impl FileKvStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreFile> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }

        let content = fs_err::read_to_string(&self.path)
            .map_err(|err| AlertsError::io("read store file", err))?;

        if content.trim().is_empty() {
            return Ok(StoreFile::default());
        }

        match serde_json::from_str::<StoreFile>(&content) {
            Ok(file) if file.version == FILE_VERSION => Ok(file),
            Ok(file) => {
                warn!(
                    version = file.version,
                    expected = FILE_VERSION,
                    path = %self.path.display(),
                    "Unsupported store file version, returning empty store"
                );
                Ok(StoreFile::default())
            }
            Err(err) => {
                warn!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to parse store file, returning empty store"
                );
                Ok(StoreFile::default())
            }
        }
    }

    fn save(&self, file: &StoreFile) -> Result<()> {
        let content = serde_json::to_string_pretty(file)
            .map_err(|err| AlertsError::json("serialize store file", err))?;

        let parent_dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs_err::create_dir_all(parent_dir)
            .map_err(|err| AlertsError::io("create store directory", err))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|err| AlertsError::io("create temp store file", err))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|err| AlertsError::io("write temp store file", err))?;
        temp_file
            .flush()
            .map_err(|err| AlertsError::io("flush temp store file", err))?;
        temp_file
            .persist(&self.path)
            .map_err(|err| AlertsError::io("replace store file", err.error))?;

        Ok(())
    }

    fn modify<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> Result<T> {
        let _guard = self
            .io_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = self.load()?;
        let result = f(&mut file.entries);
        self.save(&file)?;
        Ok(result)
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .io_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.load()?.entries.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        let _guard = self
            .io_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.load()?.entries.into_keys().collect())
    }

    fn clear(&self) -> Result<()> {
        self.modify(|entries| entries.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_new_instance() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store.json");

        FileKvStore::new(&path).set("token", "abc").unwrap();

        let reopened = FileKvStore::new(&path);
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = tempdir().unwrap();
        let kv = FileKvStore::new(&temp.path().join("absent.json"));
        assert!(kv.get("anything").unwrap().is_none());
        assert!(kv.keys().unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_is_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store.json");
        fs_err::write(&path, "").unwrap();

        let kv = FileKvStore::new(&path);
        assert!(kv.keys().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty_and_recoverable() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store.json");
        fs_err::write(&path, "{not json").unwrap();

        let kv = FileKvStore::new(&path);
        assert!(kv.get("token").unwrap().is_none());

        kv.set("token", "fresh").unwrap();
        assert_eq!(kv.get("token").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_unsupported_version_is_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store.json");
        fs_err::write(&path, r#"{"version":99,"entries":{"token":"x"}}"#).unwrap();

        let kv = FileKvStore::new(&path);
        assert!(kv.get("token").unwrap().is_none());
    }

    #[test]
    fn test_creates_parent_directory_on_write() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("store.json");

        let kv = FileKvStore::new(&path);
        kv.set("a", "1").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_clear_and_remove() {
        let temp = tempdir().unwrap();
        let kv = FileKvStore::new(&temp.path().join("store.json"));
        kv.set("a", "1").unwrap();
        kv.set("b", "2").unwrap();

        kv.remove("a").unwrap();
        assert_eq!(kv.keys().unwrap(), vec!["b".to_string()]);

        kv.clear().unwrap();
        assert!(kv.keys().unwrap().is_empty());
    }
}
