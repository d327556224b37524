//! Key-value persistence for the session namespace.
//!
//! Everything the alert cache remembers between runs lives under a handful of
//! logical keys in one [`KvStore`]. Values are JSON documents stored as strings,
//! mirroring the browser-style storage surface the rest of the app writes to.
//!
//! # Backends
//!
//! - [`FileKvStore`]: one JSON file, atomic temp file + rename on every write.
//! - [`MemoryKvStore`]: process-local map for tests and embedding.
//!
//! Neither backend makes read-modify-write cycles atomic on its own; callers that
//! need that (the notification store) serialize themselves.

mod file;
mod memory;

pub use file::FileKvStore;
pub use memory::MemoryKvStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{AlertsError, Result};

/// Serialized list of notifications, newest first.
pub const NOTIFICATIONS_KEY: &str = "notifications";
/// Low-water-mark timestamp for the change detector.
pub const LAST_CHECK_KEY: &str = "lastNotificationCheck";
/// Timestamp written at each successful login.
pub const LAST_LOGIN_KEY: &str = "lastLoginTime";
/// Bearer credential owned by the auth subsystem.
pub const AUTH_TOKEN_KEY: &str = "token";

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
    fn clear(&self) -> Result<()>;
}

/// Reads and decodes a JSON value, treating unreadable or malformed content as absent.
pub fn read_json<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, error = %err, "Failed to read persisted value; treating as absent");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "Persisted value is malformed; treating as absent");
            None
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(kv: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)
        .map_err(|err| AlertsError::json(format!("serialize {}", key), err))?;
    kv.set(key, &raw)
}
