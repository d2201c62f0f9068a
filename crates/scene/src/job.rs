use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::target::Target;
use crate::timestamp;

/// Opaque job identifier as issued by the server (number or string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobId::Number(n) => write!(f, "{n}"),
            JobId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for JobId {
    fn from(n: i64) -> Self {
        JobId::Number(n)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId::Text(s.to_string())
    }
}

impl std::str::FromStr for JobId {
    type Err = std::convert::Infallible;

    /// Numeric strings become [`JobId::Number`], matching what the server
    /// sends for integer ids.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => JobId::Number(n),
            Err(_) => JobId::Text(s.to_string()),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Scheduled,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default = "default_drone_count")]
    pub drone_count: u32,
    pub status: JobStatus,
    /// Present only for date-scheduled jobs; `None` marks an immediate job.
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

fn default_drone_count() -> u32 {
    1
}

impl Job {
    pub fn is_cancelled(&self) -> bool {
        self.status == JobStatus::Cancelled
    }

    pub fn is_immediate(&self) -> bool {
        self.start_at.is_none()
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }
}
