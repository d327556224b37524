//! Serialized notification types.
//!
//! Field names are camelCase on disk so the persisted list stays readable by
//! the other clients sharing the session namespace.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
        };
        f.pad(label)
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(NotificationKind::Info),
            "success" => Ok(NotificationKind::Success),
            "error" => Ok(NotificationKind::Error),
            other => Err(format!("unknown notification kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub read: bool,
    /// Dismissed by the user but kept so the same event is not announced twice.
    #[serde(default)]
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: &str, kind: NotificationKind, created_at: DateTime<Utc>) -> Self {
        Notification {
            id: next_notification_id(created_at),
            message: message.to_string(),
            kind,
            read: false,
            processed: false,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.processed
    }
}

static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Builds `notif-<millis>-<hex>`; `<millis>` never repeats within the process.
fn next_notification_id(at: DateTime<Utc>) -> String {
    let wanted = at.timestamp_millis();
    let mut previous = LAST_ID_MILLIS.load(Ordering::Relaxed);
    let millis = loop {
        let candidate = wanted.max(previous + 1);
        match LAST_ID_MILLIS.compare_exchange_weak(
            previous,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break candidate,
            Err(current) => previous = current,
        }
    };
    let suffix = rand::thread_rng().next_u64();
    format!("notif-{}-{:x}", millis, suffix)
}
