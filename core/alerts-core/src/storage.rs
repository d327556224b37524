//! Storage configuration and path management for expense-alerts.
//!
//! All on-disk locations are decided here so tests can point the whole
//! library at a temp directory via [`StorageConfig::with_root`].

use std::path::{Path, PathBuf};

/// Central configuration for all expense-alerts storage paths.
///
/// Production code uses `StorageConfig::default()` which points to `~/.expense-alerts/`.
/// Tests use `StorageConfig::with_root(temp_dir)` for isolation.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            root: home.join(".expense-alerts"),
        }
    }
}

impl StorageConfig {
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to store.json (the persisted key-value namespace for the session).
    pub fn store_file(&self) -> PathBuf {
        self.root.join("store.json")
    }

    /// Path to config.toml (API endpoint and polling preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to logs/ directory (rolling CLI logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory and standard subdirectories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)?;
        fs_err::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
