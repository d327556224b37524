use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEBUG_LOG_ENV: &str = "EXPENSE_ALERTS_DEBUG_LOG";

/// Installs stderr logging plus a daily log file under `logs_dir`.
///
/// The returned guard flushes the file writer on drop; hold it for the life of
/// the process. If the log directory is unusable only stderr is wired up.
pub fn init(logs_dir: &Path) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = if fs_err::create_dir_all(logs_dir).is_ok() {
        let appender = tracing_appender::rolling::daily(logs_dir, "expense-alerts.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let result = tracing_subscriber::registry()
        .with(filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    if result.is_err() {
        return None;
    }
    guard
}

fn filter() -> EnvFilter {
    let debug_enabled = env::var(DEBUG_LOG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
