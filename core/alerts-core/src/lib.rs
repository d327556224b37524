//! # alerts-core
//!
//! Client-resident cache of expense status alerts: a persisted notification list,
//! a poller that turns remote approval and rejection changes into alerts, and the
//! session handling that keeps dismissed alerts dismissed across logins.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Polling runs on a plain thread.
//! - **Thread-safe store**: One writer lock serializes every read-merge-write cycle.
//! - **Graceful degradation**: Missing or malformed persisted data reads as empty.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use alerts_core::AlertsEngine;
//!
//! let engine = AlertsEngine::new()?;
//! let unread = engine.unread_count();
//! let active = engine.active_notifications();
//! ```

pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod kv;
pub mod notifications;
pub mod session;
pub mod storage;
pub mod watermark;

pub use config::{load_config, AlertsConfig};
pub use detector::{
    spawn_detector, CancellationToken, ChangeDetector, DetectorHandle, DetectorState,
    HttpSnapshotSource, SkipReason, SnapshotSource, TickReport,
};
pub use engine::AlertsEngine;
pub use error::{AlertsError, Result};
pub use kv::{FileKvStore, KvStore, MemoryKvStore};
pub use notifications::{
    Notification, NotificationKind, NotificationStore, NotificationView, DEDUP_WINDOW_SECS,
    MAX_NOTIFICATIONS,
};
pub use session::SessionBoundary;
pub use storage::StorageConfig;
