//! JSON shapes returned by the library server.
//!
//! Initiation endpoints (`/author/bulk-download/{id}`,
//! `/series/bulk-download/{id}`) answer with [`InitiationResponse`];
//! `/ajax/task-status/{task_id}` answers with [`TaskStatusResponse`].

use serde::Deserialize;

use crate::types::JobId;

/// Status values that mean the archive is ready.
pub const SUCCESS_STATUSES: &[&str] = &["completed", "finished"];

/// Status values that mean the task gave up.
pub const FAILURE_STATUSES: &[&str] = &["failed", "error"];

/// Body of a successful initiation request.
#[derive(Debug, Clone, Deserialize)]
pub struct InitiationResponse {
    /// Absent (or empty) when the server did not queue a task.
    #[serde(default, deserialize_with = "non_empty_id")]
    pub task_id: Option<JobId>,
    /// Human-readable description of the queued task.
    #[serde(default)]
    pub message: Option<String>,
}

/// An accepted initiation: the job to track and the server's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiation {
    pub job_id: JobId,
    pub message: Option<String>,
}

impl InitiationResponse {
    /// `None` when the server queued nothing.
    pub fn into_initiation(self) -> Option<Initiation> {
        let job_id = self.task_id?;
        Some(Initiation {
            job_id,
            message: self.message.filter(|m| !m.is_empty()),
        })
    }
}

/// Body of a status query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub status: String,
    /// Completion fraction in `0..=1`.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Coarse classification of a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Running,
    Completed,
    Failed,
}

impl TaskPhase {
    /// Classify a raw status string. Unknown values mean "still running".
    pub fn classify(status: &str) -> Self {
        if SUCCESS_STATUSES.contains(&status) {
            Self::Completed
        } else if FAILURE_STATUSES.contains(&status) {
            Self::Failed
        } else {
            Self::Running
        }
    }
}

impl TaskStatusResponse {
    pub fn phase(&self) -> TaskPhase {
        TaskPhase::classify(&self.status)
    }
}

fn non_empty_id<'de, D>(deserializer: D) -> Result<Option<JobId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let id = Option::<JobId>::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.as_str().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognised_statuses() {
        assert_eq!(TaskPhase::classify("completed"), TaskPhase::Completed);
        assert_eq!(TaskPhase::classify("finished"), TaskPhase::Completed);
        assert_eq!(TaskPhase::classify("failed"), TaskPhase::Failed);
        assert_eq!(TaskPhase::classify("error"), TaskPhase::Failed);
    }

    #[test]
    fn classify_anything_else_as_running() {
        assert_eq!(TaskPhase::classify("running"), TaskPhase::Running);
        assert_eq!(TaskPhase::classify("queued"), TaskPhase::Running);
        assert_eq!(TaskPhase::classify(""), TaskPhase::Running);
        assert_eq!(TaskPhase::classify("COMPLETED"), TaskPhase::Running);
    }

    #[test]
    fn parse_initiation_with_message() {
        let json = r#"{"success":true,"task_id":"t-1","message":"Preparing ZIP file for author: Le Guin"}"#;
        let resp: InitiationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.task_id, Some(JobId::new("t-1")));
        assert_eq!(
            resp.message.as_deref(),
            Some("Preparing ZIP file for author: Le Guin")
        );
    }

    #[test]
    fn parse_initiation_without_task_id() {
        let resp: InitiationResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(resp.task_id.is_none());
        assert!(resp.message.is_none());
    }

    #[test]
    fn empty_or_null_task_id_counts_as_missing() {
        let empty: InitiationResponse = serde_json::from_str(r#"{"task_id":""}"#).unwrap();
        assert!(empty.task_id.is_none());

        let null: InitiationResponse = serde_json::from_str(r#"{"task_id":null}"#).unwrap();
        assert!(null.task_id.is_none());
    }

    #[test]
    fn into_initiation_requires_an_id() {
        let resp: InitiationResponse =
            serde_json::from_str(r#"{"task_id":7,"message":""}"#).unwrap();
        let initiation = resp.into_initiation().unwrap();
        assert_eq!(initiation.job_id.as_str(), "7");
        assert!(initiation.message.is_none());

        let resp: InitiationResponse = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(resp.into_initiation().is_none());
    }

    #[test]
    fn parse_status_in_progress() {
        let resp: TaskStatusResponse =
            serde_json::from_str(r#"{"status":"running","progress":0.5}"#).unwrap();
        assert_eq!(resp.phase(), TaskPhase::Running);
        assert_eq!(resp.progress, Some(0.5));
        assert!(resp.download_url.is_none());
    }

    #[test]
    fn parse_status_completed_with_url() {
        let json = r#"{"status":"completed","progress":1.0,"download_url":"/download-bulk/Le Guin.zip"}"#;
        let resp: TaskStatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.phase(), TaskPhase::Completed);
        assert_eq!(resp.download_url.as_deref(), Some("/download-bulk/Le Guin.zip"));
    }

    #[test]
    fn parse_status_missing_status_is_running() {
        let resp: TaskStatusResponse = serde_json::from_str(r#"{"progress":0.1}"#).unwrap();
        assert_eq!(resp.phase(), TaskPhase::Running);
    }

    #[test]
    fn non_numeric_progress_is_a_decode_error() {
        assert!(serde_json::from_str::<TaskStatusResponse>(r#"{"progress":"half"}"#).is_err());
    }
}
