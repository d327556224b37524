//! Persisted notification collection with an in-memory mirror.
//!
//! # Writers
//!
//! Three writers touch the persisted `notifications` key: explicit API calls,
//! the change detector, and the session boundary handler. All of them go through
//! this type, and every mutation holds one writer lock for its whole
//! read-merge-write cycle, so two concurrent inserts can't read the same
//! pre-mutation list and drop each other's record.
//!
//! ```text
//! add()/mark_*()  ──┐
//! detector tick  ───┼──▶ writer lock ──▶ re-read persisted ──▶ merge ──▶ write ──▶ mirror
//! session handler ──┘                                                         │
//!                                                                 subscribers ◀┘
//! ```
//!
//! The lock is per store instance. Separate processes sharing the same file
//! are not serialized against each other; the 1-second collapse in
//! [`merge`](super::merge) limits the damage of such races to duplicate
//! suppression.
//!
//! # Malformed Data
//!
//! Unreadable or malformed persisted content is treated as an empty list so the
//! store never loses the ability to notify.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::merge::{find_recent_duplicate, merge_insert};
use super::types::{Notification, NotificationKind};
use crate::error::Result;
use crate::kv::{read_json, write_json, KvStore, NOTIFICATIONS_KEY};

/// Derived view handed to consumers (badge, list) and subscribers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationView {
    pub active: Vec<Notification>,
    pub unread_count: usize,
}

impl NotificationView {
    fn from_records(records: &[Notification]) -> Self {
        let active: Vec<Notification> = records.iter().filter(|n| n.is_active()).cloned().collect();
        let unread_count = active.iter().filter(|n| !n.read).count();
        NotificationView {
            active,
            unread_count,
        }
    }
}

pub struct NotificationStore {
    kv: Arc<dyn KvStore>,
    /// Mirror of the persisted list (processed records included), newest first.
    /// Also the writer lock.
    records: Mutex<Vec<Notification>>,
    subscribers: Mutex<Vec<Sender<NotificationView>>>,
}

impl NotificationStore {
    pub fn open(kv: Arc<dyn KvStore>) -> Self {
        let records = load_persisted(kv.as_ref());
        NotificationStore {
            kv,
            records: Mutex::new(records),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Consumer API
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a notification, or returns the id of an identical one created in the
    /// last minute.
    pub fn add(&self, message: &str, kind: NotificationKind) -> Result<String> {
        self.add_at(message, kind, Utc::now())
    }

    pub fn mark_as_read(&self, id: &str) -> Result<()> {
        self.update_where(|n| n.id == id, |n| n.read = true)
    }

    pub fn mark_all_as_read(&self) -> Result<()> {
        self.update_where(|_| true, |n| n.read = true)
    }

    pub fn mark_as_processed(&self, id: &str) -> Result<()> {
        self.update_where(|n| n.id == id, |n| n.processed = true)
    }

    pub fn mark_all_as_processed(&self) -> Result<()> {
        self.update_where(|_| true, |n| n.processed = true)
    }

    /// Soft delete: the record stays persisted (processed) for dedup.
    pub fn remove(&self, id: &str) -> Result<()> {
        self.mark_as_processed(id)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.mark_all_as_processed()
    }

    pub fn active_notifications(&self) -> Vec<Notification> {
        self.view().active
    }

    pub fn unread_count(&self) -> usize {
        self.view().unread_count
    }

    pub fn view(&self) -> NotificationView {
        NotificationView::from_records(&self.lock_records())
    }

    /// Receives the derived view after every mutation. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> Receiver<NotificationView> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sender);
        receiver
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Detector / Session Support
    // ─────────────────────────────────────────────────────────────────────────

    /// The full persisted collection, processed records included, read fresh.
    pub fn history(&self) -> Vec<Notification> {
        let _guard = self.lock_records();
        load_persisted(self.kv.as_ref())
    }

    /// Backing store, for reading keys this type doesn't own. Writes go through
    /// [`exclusive`](Self::exclusive).
    pub fn kv(&self) -> &dyn KvStore {
        self.kv.as_ref()
    }

    /// Re-hydrates the mirror from persistence.
    pub fn reload(&self) {
        {
            let mut records = self.lock_records();
            *records = load_persisted(self.kv.as_ref());
        }
        self.publish();
    }

    /// Runs `f` against the backing store while holding the writer lock, then
    /// re-syncs the mirror. Used by writers that touch keys besides
    /// `notifications` (low-water-mark, session keys).
    pub fn exclusive<T>(&self, f: impl FnOnce(&dyn KvStore) -> Result<T>) -> Result<T> {
        let result = {
            let mut records = self.lock_records();
            let result = f(self.kv.as_ref());
            *records = load_persisted(self.kv.as_ref());
            result
        };
        self.publish();
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn add_at(
        &self,
        message: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let id = {
            let mut records = self.lock_records();

            // Another writer may have changed the list since we last looked.
            *records = load_persisted(self.kv.as_ref());

            if let Some(existing) = find_recent_duplicate(&records, message, kind, now) {
                debug!(id = %existing.id, kind = %kind, "Duplicate notification within window");
                return Ok(existing.id.clone());
            }

            let notification = Notification::new(message, kind, now);
            let id = notification.id.clone();
            records.insert(0, notification.clone());

            let merged = merge_insert(load_persisted(self.kv.as_ref()), notification);
            write_json(self.kv.as_ref(), NOTIFICATIONS_KEY, &merged)?;
            *records = merged;
            id
        };

        debug!(id = %id, kind = %kind, "Notification added");
        self.publish();
        Ok(id)
    }

    fn update_where(
        &self,
        matches: impl Fn(&Notification) -> bool,
        apply: impl Fn(&mut Notification),
    ) -> Result<()> {
        {
            let mut records = self.lock_records();
            let mut persisted = load_persisted(self.kv.as_ref());

            let mut changed = false;
            for notification in persisted.iter_mut().filter(|n| matches(&**n)) {
                let before = notification.clone();
                apply(notification);
                changed |= *notification != before;
            }

            if changed {
                write_json(self.kv.as_ref(), NOTIFICATIONS_KEY, &persisted)?;
            }
            *records = persisted;
        }

        self.publish();
        Ok(())
    }

    fn lock_records(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if subscribers.is_empty() {
            return;
        }
        let view = self.view();
        subscribers.retain(|sender| sender.send(view.clone()).is_ok());
    }
}

fn load_persisted(kv: &dyn KvStore) -> Vec<Notification> {
    let mut records: Vec<Notification> = read_json(kv, NOTIFICATIONS_KEY).unwrap_or_default();
    records.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    records
}
