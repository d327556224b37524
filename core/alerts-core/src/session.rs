//! Login and logout handling for the persisted namespace.
//!
//! Logout wipes every key except the notification list and the low-water-mark,
//! so alerts the user dismissed stay dismissed across sessions. Login seeds the
//! low-water-mark from the previous login, so changes made while the user was
//! away are still announced on the first tick.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::Result;
use crate::kv::{KvStore, AUTH_TOKEN_KEY, LAST_CHECK_KEY, NOTIFICATIONS_KEY};
use crate::notifications::NotificationStore;
use crate::watermark::{last_login, set_last_login, set_low_water_mark};

/// Bearer credential, if one is stored.
///
/// Accepts either a bare string or a JSON-encoded string; blank values count as
/// absent.
pub fn auth_token(kv: &dyn KvStore) -> Option<String> {
    let raw = kv.get(AUTH_TOKEN_KEY).ok().flatten()?;
    let token = match serde_json::from_str::<String>(&raw) {
        Ok(decoded) => decoded,
        Err(_) => raw,
    };
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub struct SessionBoundary {
    store: Arc<NotificationStore>,
}

impl SessionBoundary {
    pub fn new(store: Arc<NotificationStore>) -> Self {
        Self { store }
    }

    /// Clears the namespace, keeping only `notifications` and `lastNotificationCheck`.
    pub fn on_logout(&self) -> Result<()> {
        self.store.exclusive(|kv| {
            let notifications = kv.get(NOTIFICATIONS_KEY)?;
            let mark = kv.get(LAST_CHECK_KEY)?;

            kv.clear()?;

            if let Some(raw) = notifications {
                kv.set(NOTIFICATIONS_KEY, &raw)?;
            }
            if let Some(raw) = mark {
                kv.set(LAST_CHECK_KEY, &raw)?;
            }
            Ok(())
        })?;
        info!("Session cleared on logout");
        Ok(())
    }

    pub fn on_login(&self) -> Result<()> {
        self.on_login_at(Utc::now())
    }

    pub fn on_login_at(&self, now: DateTime<Utc>) -> Result<()> {
        self.store.exclusive(|kv| {
            if let Some(previous) = last_login(kv) {
                debug!(%previous, "Seeding low-water-mark from previous login");
                set_low_water_mark(kv, previous)?;
            }
            set_last_login(kv, now)
        })?;
        info!("Session started");
        Ok(())
    }
}
