use foundation::math::WorldPoint;
use serde::{Deserialize, Serialize};

use crate::job::Job;

/// Full world state as served by both the poll endpoint and the push feed.
///
/// Snapshots are replaced wholesale on every update; nothing merges into an
/// existing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub flock: Vec<WorldPoint>,
    #[serde(default)]
    pub drones: Vec<WorldPoint>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    /// Obstacle rings.
    #[serde(default)]
    pub polygons: Vec<Vec<WorldPoint>>,
    #[serde(default)]
    pub paused: bool,
}

impl StateSnapshot {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Jobs that still matter for display (everything but cancelled).
    pub fn live_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|j| !j.is_cancelled())
    }
}
