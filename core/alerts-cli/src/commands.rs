use std::sync::mpsc;

use alerts_core::{
    AlertsEngine, AlertsError, HttpSnapshotSource, Notification, NotificationKind, Result,
    StorageConfig, TickReport,
};
use chrono::Local;
use tracing::info;

fn engine(storage: &StorageConfig) -> Result<AlertsEngine> {
    AlertsEngine::with_storage(storage.clone())
}

pub fn login(storage: &StorageConfig, token: &str) -> Result<()> {
    engine(storage)?.login(token)?;
    println!("Logged in.");
    Ok(())
}

pub fn logout(storage: &StorageConfig) -> Result<()> {
    engine(storage)?.logout()?;
    println!("Logged out.");
    Ok(())
}

pub fn list(storage: &StorageConfig, all: bool) -> Result<()> {
    let engine = engine(storage)?;
    let notifications = if all {
        engine.all_notifications()
    } else {
        engine.active_notifications()
    };

    if notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }
    for notification in &notifications {
        println!("{}", render(notification));
    }
    println!("{} unread", engine.unread_count());
    Ok(())
}

pub fn add(storage: &StorageConfig, message: &str, kind: NotificationKind) -> Result<()> {
    let id = engine(storage)?.add(message, kind)?;
    println!("{}", id);
    Ok(())
}

pub fn read(storage: &StorageConfig, id: &str) -> Result<()> {
    engine(storage)?.mark_as_read(id)
}

pub fn read_all(storage: &StorageConfig) -> Result<()> {
    engine(storage)?.mark_all_as_read()
}

pub fn remove(storage: &StorageConfig, id: &str) -> Result<()> {
    engine(storage)?.remove(id)
}

pub fn clear(storage: &StorageConfig) -> Result<()> {
    engine(storage)?.clear_all()
}

pub fn check(storage: &StorageConfig) -> Result<()> {
    let engine = engine(storage)?;
    let source = HttpSnapshotSource::new(&engine.config())?;
    let report = engine.check_now(source)?;
    println!("{}", summarize(&report));
    Ok(())
}

pub fn watch(storage: &StorageConfig) -> Result<()> {
    let engine = engine(storage)?;
    if !engine.is_logged_in() {
        return Err(AlertsError::NotLoggedIn);
    }
    let config = engine.config();
    let source = HttpSnapshotSource::new(&config)?;

    let updates = engine.subscribe();
    let (interrupt_tx, interrupt_rx) = mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .map_err(|err| AlertsError::Io {
        context: "install Ctrl-C handler".to_string(),
        source: std::io::Error::other(err),
    })?;

    let watcher = engine.start_watcher(source, config.poll_interval())?;
    info!(url = %config.api_base_url, "Watching for expense updates (Ctrl-C to stop)");

    let mut seen = engine.unread_count();
    loop {
        if interrupt_rx.recv_timeout(std::time::Duration::from_millis(200)).is_ok() {
            break;
        }
        while let Ok(view) = updates.try_recv() {
            if view.unread_count > seen {
                for notification in view.active.iter().filter(|n| !n.read).take(view.unread_count - seen) {
                    println!("{}", render(notification));
                }
            }
            seen = view.unread_count;
        }
    }

    watcher.join();
    Ok(())
}

fn render(notification: &Notification) -> String {
    let marker = if notification.processed {
        "x"
    } else if notification.read {
        " "
    } else {
        "*"
    };
    format!(
        "[{}] {} {:<7} {}  {}",
        marker,
        notification.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        notification.kind,
        notification.id,
        notification.message
    )
}

fn summarize(report: &TickReport) -> String {
    if let Some(reason) = report.skipped {
        return format!("Check skipped: {:?}", reason);
    }
    format!(
        "Fetched {} expenses: {} new alerts, {} already dismissed",
        report.fetched, report.announced, report.suppressed
    )
}
