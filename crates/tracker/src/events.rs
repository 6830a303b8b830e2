//! Lifecycle events emitted by the job tracker.
//!
//! Published on a [`tokio::sync::broadcast`] channel; call
//! [`JobTracker::subscribe`](crate::JobTracker::subscribe) to receive them.

use serde::Serialize;
use shelfzip_core::types::JobId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// The server accepted a job and polling began.
    Started { job_id: JobId },

    /// The initiation request failed; nothing is tracked.
    StartFailed { reason: String },

    /// A poll reported progress.
    Progress {
        job_id: JobId,
        /// Completion percentage (0-100).
        percent: u8,
    },

    /// The archive is ready.
    Completed {
        job_id: JobId,
        download_url: Option<String>,
    },

    /// The job failed on the server or its status could not be fetched.
    Failed { job_id: JobId, reason: String },

    /// The job was cancelled locally.
    Cancelled { job_id: JobId },
}

impl TrackerEvent {
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Self::Started { job_id }
            | Self::Progress { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Cancelled { job_id } => Some(job_id),
            Self::StartFailed { .. } => None,
        }
    }

    /// True for events after which the job is no longer tracked.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::StartFailed { .. }
                | Self::Completed { .. }
                | Self::Failed { .. }
                | Self::Cancelled { .. }
        )
    }
}
