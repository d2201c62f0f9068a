use std::collections::BTreeMap;

use scene::{Job, JobId, Target};

use crate::layer::{Layer, LayerId};

/// Facts the job list drawing needs, recomputed from scratch on every
/// change.
///
/// - The active job is the first non-cancelled job (list order) that is
///   marked active and has a target. At most one, whatever the server sent.
/// - Immediate jobs (no start time) with a target are numbered from zero by
///   creation time; ties keep list order. Everything else has no position.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JobOverlay {
    active: Option<JobId>,
    queue: BTreeMap<JobId, usize>,
}

impl JobOverlay {
    pub fn derive(jobs: &[Job]) -> Self {
        let live = || jobs.iter().filter(|j| !j.is_cancelled());

        let active = live()
            .find(|j| j.is_active && j.has_target())
            .map(|j| j.id.clone());

        let mut immediate: Vec<&Job> = live()
            .filter(|j| j.is_immediate() && j.has_target())
            .collect();
        // `sort_by_key` is stable.
        immediate.sort_by_key(|j| j.created_at);

        let mut queue = BTreeMap::new();
        for (pos, job) in immediate.into_iter().enumerate() {
            queue.entry(job.id.clone()).or_insert(pos);
        }

        Self { active, queue }
    }

    pub fn active_job(&self) -> Option<&JobId> {
        self.active.as_ref()
    }

    pub fn is_active(&self, id: &JobId) -> bool {
        self.active.as_ref() == Some(id)
    }

    pub fn queue_position(&self, id: &JobId) -> Option<usize> {
        self.queue.get(id).copied()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Queue members in position order.
    pub fn queue(&self) -> Vec<&JobId> {
        let mut ids: Vec<(&JobId, usize)> = self.queue.iter().map(|(id, pos)| (id, *pos)).collect();
        ids.sort_by_key(|(_, pos)| *pos);
        ids.into_iter().map(|(id, _)| id).collect()
    }
}

/// One drawable target with both overlay facts attached.
#[derive(Debug, Clone, PartialEq)]
pub struct JobMarker {
    pub id: JobId,
    pub target: Target,
    pub drone_count: u32,
    pub is_active: bool,
    pub queue_position: Option<usize>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct JobsLayer {
    id: LayerId,
}

impl JobsLayer {
    pub fn new(id: u64) -> Self {
        Self { id: LayerId(id) }
    }

    pub fn extract(&self, jobs: &[Job]) -> Vec<JobMarker> {
        job_markers(jobs, &JobOverlay::derive(jobs))
    }
}

impl Layer for JobsLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &'static str {
        "jobs"
    }
}

/// Markers for every non-cancelled job that has a target, in list order.
pub fn job_markers(jobs: &[Job], overlay: &JobOverlay) -> Vec<JobMarker> {
    jobs.iter()
        .filter(|j| !j.is_cancelled())
        .filter_map(|j| {
            let target = j.target.clone()?;
            Some(JobMarker {
                id: j.id.clone(),
                target,
                drone_count: j.drone_count,
                is_active: overlay.is_active(&j.id),
                queue_position: overlay.queue_position(&j.id),
            })
        })
        .collect()
}
