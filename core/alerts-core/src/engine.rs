//! AlertsEngine - the entry point for expense-alerts clients.
//!
//! Wires the file-backed key-value store, the notification store, the session
//! handler and the change detector together behind one synchronous API.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use alerts_core::{AlertsEngine, HttpSnapshotSource};
//!
//! let engine = AlertsEngine::new()?;
//! engine.login("bearer-token")?;
//! let source = HttpSnapshotSource::new(&engine.config())?;
//! let watcher = engine.start_watcher(source, engine.config().poll_interval())?;
//! let unread = engine.unread_count();
//! ```

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{load_config, AlertsConfig};
use crate::detector::{
    spawn_detector, CancellationToken, ChangeDetector, DetectorHandle, SnapshotSource, TickReport,
};
use crate::error::{AlertsError, Result};
use crate::kv::{FileKvStore, KvStore, AUTH_TOKEN_KEY};
use crate::notifications::{Notification, NotificationKind, NotificationStore, NotificationView};
use crate::session::{auth_token, SessionBoundary};
use crate::storage::StorageConfig;

pub struct AlertsEngine {
    storage: StorageConfig,
    store: Arc<NotificationStore>,
    session: SessionBoundary,
}

impl AlertsEngine {
    /// Creates an engine rooted at `~/.expense-alerts/`.
    pub fn new() -> Result<Self> {
        Self::with_storage(StorageConfig::default())
    }

    /// Creates an engine with a custom storage root. Used by tests.
    pub fn with_storage(storage: StorageConfig) -> Result<Self> {
        storage.ensure_dirs().map_err(|err| {
            AlertsError::io(format!("create {}", storage.root().display()), err)
        })?;
        let kv: Arc<dyn KvStore> = Arc::new(FileKvStore::new(&storage.store_file()));
        Ok(Self::with_kv(storage, kv))
    }

    /// Creates an engine over an arbitrary backend.
    pub fn with_kv(storage: StorageConfig, kv: Arc<dyn KvStore>) -> Self {
        let store = Arc::new(NotificationStore::open(kv));
        let session = SessionBoundary::new(Arc::clone(&store));
        Self {
            storage,
            store,
            session,
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    /// Loads `config.toml`, falling back to defaults when it is malformed.
    pub fn config(&self) -> AlertsConfig {
        let path = self.storage.config_file();
        load_config(&path).unwrap_or_else(|err| {
            warn!(error = %err, "Using default configuration");
            AlertsConfig::default()
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications API
    // ─────────────────────────────────────────────────────────────────────────

    pub fn active_notifications(&self) -> Vec<Notification> {
        self.store.active_notifications()
    }

    /// Every persisted record, dismissed ones included.
    pub fn all_notifications(&self) -> Vec<Notification> {
        self.store.history()
    }

    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    pub fn add(&self, message: &str, kind: NotificationKind) -> Result<String> {
        self.store.add(message, kind)
    }

    pub fn mark_as_read(&self, id: &str) -> Result<()> {
        self.store.mark_as_read(id)
    }

    pub fn mark_all_as_read(&self) -> Result<()> {
        self.store.mark_all_as_read()
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.store.remove(id)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.store.clear_all()
    }

    pub fn subscribe(&self) -> Receiver<NotificationView> {
        self.store.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session API
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_logged_in(&self) -> bool {
        auth_token(self.store.kv()).is_some()
    }

    /// Stores the bearer credential and runs the login boundary.
    pub fn login(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AlertsError::EmptyToken);
        }
        self.store.exclusive(|kv| kv.set(AUTH_TOKEN_KEY, token))?;
        self.session.on_login()
    }

    pub fn logout(&self) -> Result<()> {
        self.session.on_logout()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Detector API
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs a single detector tick in the calling thread.
    pub fn check_now<S: SnapshotSource>(&self, source: S) -> Result<TickReport> {
        if !self.is_logged_in() {
            return Err(AlertsError::NotLoggedIn);
        }
        let detector = ChangeDetector::new(Arc::clone(&self.store), source);
        detector.tick(&CancellationToken::new())
    }

    /// Starts background polling. Dropping the handle stops it.
    pub fn start_watcher<S>(&self, source: S, interval: Duration) -> Result<DetectorHandle>
    where
        S: SnapshotSource + 'static,
    {
        let detector = Arc::new(ChangeDetector::new(Arc::clone(&self.store), source));
        let handle = spawn_detector(detector, interval)?;
        info!(interval_secs = interval.as_secs(), "Watcher started");
        Ok(handle)
    }
}
