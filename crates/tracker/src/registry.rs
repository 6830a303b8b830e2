//! Job registry: the tracker's only shared mutable state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shelfzip_core::job::{progress_percent, JobState};
use shelfzip_core::types::JobId;

use crate::display::ProgressDisplay;
use crate::poller::PollHandle;

/// One tracked job.
pub(crate) struct Job {
    pub id: JobId,
    pub state: JobState,
    /// Latest server-reported fraction.
    pub progress: f64,
    /// Download locator, set on completion.
    pub result_ref: Option<String>,
    pub display: Option<Arc<dyn ProgressDisplay>>,
    /// `None` only once the job left `Polling`.
    pub poll: Option<PollHandle>,
    /// Highest tick number applied so far.
    pub last_tick: u64,
    pub started_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, display: Option<Arc<dyn ProgressDisplay>>) -> Self {
        Self {
            id,
            state: JobState::Starting,
            progress: 0.0,
            result_ref: None,
            display,
            poll: None,
            last_tick: 0,
            started_at: Utc::now(),
        }
    }

    /// Release the poller. Safe to call more than once; only the first
    /// call stops anything.
    pub fn release_poller(&mut self) -> Option<PollHandle> {
        self.poll.take()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id.clone(),
            state: self.state.as_str(),
            progress: self.progress,
            percent: progress_percent(self.progress),
            download_url: self.result_ref.clone(),
            started_at: self.started_at,
        }
    }
}

/// Read-only view of a tracked job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub state: &'static str,
    pub progress: f64,
    pub percent: u8,
    pub download_url: Option<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Default)]
pub(crate) struct JobRegistry {
    jobs: HashMap<JobId, Job>,
}

impl JobRegistry {
    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.contains_key(id)
    }

    /// Insert a job. Callers check [`contains`](Self::contains) first.
    pub fn insert(&mut self, job: Job) {
        debug_assert!(!self.jobs.contains_key(&job.id), "job registered twice");
        self.jobs.insert(job.id.clone(), job);
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// The job, unless it has already reached a terminal state.
    pub fn get_unfinished_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.get_mut(id).filter(|job| !job.state.is_terminal())
    }

    pub fn remove(&mut self, id: &JobId) -> Option<Job> {
        self.jobs.remove(id)
    }

    /// Claim tick `tick` for `id`.
    ///
    /// Returns the job only if it is still registered, still polling and
    /// `tick` is newer than every tick already applied. Anything else is a
    /// stale response and must be ignored.
    pub fn accept_tick(&mut self, id: &JobId, tick: u64) -> Option<&mut Job> {
        let job = self.jobs.get_mut(id)?;
        if job.state != JobState::Polling || tick <= job.last_tick {
            return None;
        }
        job.last_tick = tick;
        Some(job)
    }

    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        let mut list: Vec<JobSnapshot> = self.jobs.values().map(Job::snapshot).collect();
        list.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.job_id.as_str().cmp(b.job_id.as_str()))
        });
        list
    }

    pub fn drain(&mut self) -> Vec<Job> {
        self.jobs.drain().map(|(_, job)| job).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}
