use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::cancel::CancellationToken;
use super::poller::ChangeDetector;
use super::source::SnapshotSource;
use crate::error::{AlertsError, Result};

/// Owns the background polling thread. Dropping it stops the loop.
pub struct DetectorHandle {
    cancel: CancellationToken,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DetectorHandle {
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signals the loop to exit. A tick already past its fetch discards its result.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.stop_tx.take();
    }

    /// Stops the loop and waits for the thread to finish.
    pub fn join(mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Detector thread panicked");
            }
        }
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs one tick immediately, then one per `interval`, until stopped.
pub fn spawn_detector<S>(detector: Arc<ChangeDetector<S>>, interval: Duration) -> Result<DetectorHandle>
where
    S: SnapshotSource + 'static,
{
    let cancel = CancellationToken::new();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let loop_cancel = cancel.clone();

    let thread = thread::Builder::new()
        .name("alerts-detector".to_string())
        .spawn(move || {
            info!(interval_secs = interval.as_secs(), "Change detector started");
            loop {
                if loop_cancel.is_cancelled() {
                    break;
                }
                match detector.tick(&loop_cancel) {
                    Ok(report) => debug!(
                        skipped = ?report.skipped,
                        fetched = report.fetched,
                        announced = report.announced,
                        suppressed = report.suppressed,
                        "Detector tick finished"
                    ),
                    Err(err) => warn!(error = %err, "Detector tick failed"),
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("Change detector stopped");
        })
        .map_err(|err| AlertsError::io("spawn detector thread", err))?;

    Ok(DetectorHandle {
        cancel,
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvStore, MemoryKvStore, AUTH_TOKEN_KEY};
    use crate::notifications::NotificationStore;
    use crate::watermark::set_low_water_mark;
    use chrono::Utc;
    use expense_protocol::{ApprovalStatus, RemoteSnapshot, SubmissionStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        snapshots: Vec<RemoteSnapshot>,
    }

    impl SnapshotSource for CountingSource {
        fn fetch(&self, _token: &str) -> Result<Vec<RemoteSnapshot>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.snapshots.clone())
        }
    }

    fn store_with_mark() -> Arc<NotificationStore> {
        let kv = Arc::new(MemoryKvStore::new());
        kv.set(AUTH_TOKEN_KEY, "secret").unwrap();
        set_low_water_mark(kv.as_ref(), Utc::now() - chrono::Duration::hours(1)).unwrap();
        Arc::new(NotificationStore::open(kv))
    }

    fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        done()
    }

    #[test]
    fn test_first_tick_runs_immediately() {
        let store = store_with_mark();
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: Arc::clone(&calls),
            snapshots: vec![RemoteSnapshot {
                id: "exp-1".to_string(),
                merchant: "Acme".to_string(),
                amount: 85.0,
                currency: "AED".to_string(),
                approval_status: ApprovalStatus::Approved,
                submission_status: SubmissionStatus::Submitted,
                updated_at: Utc::now(),
                reason_for_rejection: None,
            }],
        };
        let detector = Arc::new(ChangeDetector::new(Arc::clone(&store), source));

        let handle = spawn_detector(detector, Duration::from_secs(3600)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || store.unread_count() == 1));
        handle.join();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_interrupts_long_interval() {
        let store = store_with_mark();
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: Arc::clone(&calls),
            snapshots: Vec::new(),
        };
        let detector = Arc::new(ChangeDetector::new(store, source));

        let handle = spawn_detector(detector, Duration::from_secs(3600)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || calls.load(Ordering::SeqCst) == 1));

        let started = Instant::now();
        handle.join();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_stop_cancels_shared_token() {
        let store = store_with_mark();
        let source = CountingSource {
            calls: Arc::new(AtomicUsize::new(0)),
            snapshots: Vec::new(),
        };
        let detector = Arc::new(ChangeDetector::new(store, source));

        let mut handle = spawn_detector(detector, Duration::from_secs(3600)).unwrap();
        let token = handle.cancellation();
        handle.stop();
        assert!(token.is_cancelled());
        handle.join();
    }
}
