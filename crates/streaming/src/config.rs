use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Timing knobs for the push/poll synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay before reopening the push feed after a failure (fixed, no jitter).
    pub retry_interval_ms: u64,

    /// Poll period while the push feed is down.
    pub poll_interval_ms: u64,

    /// How long a push subscription may go without delivering its first
    /// snapshot before it counts as failed. `0` disables the timeout.
    pub connect_timeout_ms: u64,

    /// Longest silence between snapshots on an established subscription
    /// before it counts as failed. Keep-alives do not reset it. `0` disables
    /// the watchdog.
    pub idle_timeout_ms: u64,

    /// Age after which the current snapshot is reported as stale.
    pub stale_after_ms: u64,

    /// SSE event name carrying snapshots.
    pub event_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 60_000,
            poll_interval_ms: 25,
            connect_timeout_ms: 10_000,
            idle_timeout_ms: 15_000,
            stale_after_ms: 5_000,
            event_name: "state".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.retry_interval_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "retry_interval_ms must be positive".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.event_name.is_empty() {
            return Err(FeedError::InvalidConfig("event_name is empty".to_string()));
        }
        Ok(())
    }
}

/// Where the herding backend lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub state_path: String,
    pub stream_path: String,
    pub jobs_path: String,

    /// Per-request timeout for non-streaming calls.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            state_path: "state".to_string(),
            stream_path: "stream".to_string(),
            jobs_path: "jobs".to_string(),
            request_timeout_ms: 5_000,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn state_url(&self) -> String {
        self.url(&self.state_path)
    }

    pub fn stream_url(&self) -> String {
        self.url(&self.stream_path)
    }

    pub fn job_url(&self, id: &impl std::fmt::Display) -> String {
        format!("{}/{id}", self.url(&self.jobs_path).trim_end_matches('/'))
    }
}
