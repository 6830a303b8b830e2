/// Errors returned by [`JobTracker`](crate::JobTracker).
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The initiation request failed or returned no task id.
    #[error("Failed to start download: {0}")]
    Initiation(String),

    /// [`JobTracker::shutdown`](crate::JobTracker::shutdown) already ran.
    #[error("Tracker is shut down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_initiation() {
        let err = TrackerError::Initiation("No task ID returned".into());
        assert_eq!(err.to_string(), "Failed to start download: No task ID returned");
    }

    #[test]
    fn display_shut_down() {
        assert_eq!(TrackerError::ShutDown.to_string(), "Tracker is shut down");
    }
}
