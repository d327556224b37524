//! Runtime configuration for the alert detector.
//!
//! Read from `config.toml` under the storage root. A missing file yields defaults;
//! a malformed file is an error the caller may choose to log and replace with
//! defaults. Environment variables override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{AlertsError, Result};

pub const API_URL_ENV: &str = "EXPENSE_ALERTS_API_URL";
pub const POLL_SECS_ENV: &str = "EXPENSE_ALERTS_POLL_SECS";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AlertsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(secs) = lookup(POLL_SECS_ENV).and_then(|value| value.trim().parse().ok()) {
            self.poll_interval_secs = secs;
        }
    }
}

/// Loads configuration from `path`, then applies environment overrides.
pub fn load_config(path: &Path) -> Result<AlertsConfig> {
    let mut config = read_config_file(path)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AlertsConfig> {
    if !path.exists() {
        return Ok(AlertsConfig::default());
    }

    let content = fs_err::read_to_string(path)
        .map_err(|err| AlertsError::io(format!("read config {}", path.display()), err))?;
    toml::from_str::<AlertsConfig>(&content).map_err(|err| AlertsError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}
