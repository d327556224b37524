use std::time::Duration;

use expense_protocol::{parse_snapshots, RemoteSnapshot, EXPENSES_PATH};
use tracing::{debug, warn};

use crate::config::AlertsConfig;
use crate::error::{AlertsError, Result};

/// Where the detector reads remote expense snapshots from.
pub trait SnapshotSource: Send + Sync {
    fn fetch(&self, token: &str) -> Result<Vec<RemoteSnapshot>>;
}

/// `GET {api_base_url}/expenses` with a bearer credential.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(config: &AlertsConfig) -> Result<Self> {
        Self::with_timeout(&config.api_base_url, config.request_timeout())
    }

    pub fn with_timeout(api_base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AlertsError::http("build HTTP client", err))?;
        Ok(Self {
            client,
            url: expenses_url(api_base_url),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&self, token: &str) -> Result<Vec<RemoteSnapshot>> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| AlertsError::http(format!("GET {}", self.url), err))?;

        let body = response
            .bytes()
            .map_err(|err| AlertsError::http(format!("read body of {}", self.url), err))?;

        let batch = parse_snapshots(&body)?;
        if batch.skipped > 0 {
            warn!(
                skipped = batch.skipped,
                url = %self.url,
                "Skipped malformed expense snapshots"
            );
        }
        debug!(count = batch.snapshots.len(), "Fetched expense snapshots");
        Ok(batch.snapshots)
    }
}

fn expenses_url(api_base_url: &str) -> String {
    format!("{}{}", api_base_url.trim_end_matches('/'), EXPENSES_PATH)
}
