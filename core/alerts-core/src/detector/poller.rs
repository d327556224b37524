use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::cancel::CancellationToken;
use super::events::{already_announced, classify};
use super::source::SnapshotSource;
use crate::error::Result;
use crate::kv::KvStore;
use crate::notifications::NotificationStore;
use crate::session::auth_token;
use crate::watermark::{low_water_mark, set_low_water_mark};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Checking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCredential,
    AlreadyChecking,
    Cancelled,
    /// Login, logout or a token swap happened while the tick was in flight.
    SessionChanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub skipped: Option<SkipReason>,
    pub fetched: usize,
    pub candidates: usize,
    pub announced: usize,
    /// Candidates dropped because a dismissed notification already covers them.
    pub suppressed: usize,
    pub low_water_mark: Option<DateTime<Utc>>,
}

impl TickReport {
    fn skipped(reason: SkipReason) -> Self {
        TickReport {
            skipped: Some(reason),
            ..TickReport::default()
        }
    }
}

/// Turns remote status changes into notifications.
///
/// One [`tick`](Self::tick) fetches every snapshot, announces approvals and
/// rejections updated after the low-water-mark, then advances the mark to the
/// instant the tick started. Overlapping ticks are refused rather than queued.
pub struct ChangeDetector<S: SnapshotSource> {
    store: Arc<NotificationStore>,
    source: S,
    state: Mutex<DetectorState>,
}

impl<S: SnapshotSource> ChangeDetector<S> {
    pub fn new(store: Arc<NotificationStore>, source: S) -> Self {
        Self {
            store,
            source,
            state: Mutex::new(DetectorState::Idle),
        }
    }

    pub fn state(&self) -> DetectorState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn tick(&self, cancel: &CancellationToken) -> Result<TickReport> {
        let Some(_checking) = CheckingGuard::enter(&self.state) else {
            debug!("Detector tick already in flight, skipping");
            return Ok(TickReport::skipped(SkipReason::AlreadyChecking));
        };

        let kv = self.store.kv();
        let Some(token) = auth_token(kv) else {
            debug!("No auth credential, skipping detector tick");
            return Ok(TickReport::skipped(SkipReason::NoCredential));
        };

        let started_at = Utc::now();
        let mark = low_water_mark(kv);
        let snapshots = self.source.fetch(&token)?;

        // Teardown may have happened while the fetch was in flight.
        if cancel.is_cancelled() {
            debug!("Detector cancelled during fetch, discarding result");
            return Ok(TickReport::skipped(SkipReason::Cancelled));
        }
        if let Some(reason) = session_moved(kv, &token, mark) {
            debug!(reason = ?reason, "Session changed during fetch, discarding result");
            return Ok(TickReport::skipped(reason));
        }

        let mut report = TickReport {
            fetched: snapshots.len(),
            ..TickReport::default()
        };

        match mark {
            Some(mark) => {
                let history = self.store.history();
                for snapshot in &snapshots {
                    if cancel.is_cancelled() {
                        debug!("Detector cancelled mid-tick, leaving mark untouched");
                        report.skipped = Some(SkipReason::Cancelled);
                        return Ok(report);
                    }

                    let Some(event) = classify(snapshot, mark) else {
                        continue;
                    };
                    report.candidates += 1;

                    if already_announced(&history, &event) {
                        debug!(
                            expense_id = %snapshot.id,
                            kind = %event.kind(),
                            "Event already announced and dismissed, suppressing"
                        );
                        report.suppressed += 1;
                        continue;
                    }

                    if let Some(reason) = session_moved(kv, &token, Some(mark)) {
                        debug!(reason = ?reason, "Session changed mid-tick, stopping");
                        report.skipped = Some(reason);
                        return Ok(report);
                    }

                    match self.store.add(&event.message(), event.kind()) {
                        Ok(id) => {
                            debug!(expense_id = %snapshot.id, notification_id = %id, "Announced expense update");
                            report.announced += 1;
                        }
                        Err(err) => {
                            warn!(expense_id = %snapshot.id, error = %err, "Failed to store notification");
                        }
                    }
                }
            }
            None => {
                info!("No low-water-mark yet; establishing baseline without announcing");
            }
        }

        // Only advance a mark nobody else moved; a login seed must survive.
        let advanced = self.store.exclusive(|kv| {
            if session_moved(kv, &token, mark).is_some() {
                return Ok(false);
            }
            set_low_water_mark(kv, started_at)?;
            Ok(true)
        })?;
        if advanced {
            report.low_water_mark = Some(started_at);
        } else {
            debug!("Session changed before mark advance, leaving mark untouched");
            report.skipped = Some(SkipReason::SessionChanged);
        }

        Ok(report)
    }
}

/// Why the session no longer matches the one the tick started in, if it doesn't.
fn session_moved(
    kv: &dyn KvStore,
    token: &str,
    mark: Option<DateTime<Utc>>,
) -> Option<SkipReason> {
    match auth_token(kv) {
        None => Some(SkipReason::NoCredential),
        Some(current) if current != token => Some(SkipReason::SessionChanged),
        Some(_) if low_water_mark(kv) != mark => Some(SkipReason::SessionChanged),
        Some(_) => None,
    }
}

/// Holds the detector in `Checking` for the lifetime of a tick.
struct CheckingGuard<'a> {
    state: &'a Mutex<DetectorState>,
}

impl<'a> CheckingGuard<'a> {
    fn enter(state: &'a Mutex<DetectorState>) -> Option<Self> {
        let mut current = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current == DetectorState::Checking {
            return None;
        }
        *current = DetectorState::Checking;
        Some(Self { state })
    }
}

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        let mut current = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = DetectorState::Idle;
    }
}
