//! Error types for alerts-core operations.

use std::path::PathBuf;

/// All errors that can occur in alerts-core operations.
///
/// Background writers (the detector, the session handler) log these and carry on;
/// only the explicit consumer API surfaces them to callers.
#[derive(Debug, thiserror::Error)]
pub enum AlertsError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No auth credential present; log in first")]
    NotLoggedIn,

    #[error("Auth token is empty")]
    EmptyToken,

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Remote Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("HTTP request failed: {context}: {source}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Remote payload rejected: {0}")]
    RemotePayload(#[from] expense_protocol::SnapshotParseError),
}

impl AlertsError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AlertsError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        AlertsError::Json {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn http(context: impl Into<String>, source: reqwest::Error) -> Self {
        AlertsError::Http {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using AlertsError.
pub type Result<T> = std::result::Result<T, AlertsError>;
