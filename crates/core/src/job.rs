//! Job lifecycle state machine and progress arithmetic.
//!
//! A tracked job moves `Starting -> Polling` once the server has
//! accepted it, then to exactly one of the terminal states.

use serde::Serialize;

use crate::error::CoreError;

/// Lifecycle state of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Starting,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states never poll again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Polling)
                | (Self::Polling, Self::Completed)
                | (Self::Polling, Self::Failed)
                | (Self::Polling, Self::Cancelled)
        )
    }

    /// Return `next` if the move is legal, otherwise an
    /// [`CoreError::InvalidTransition`].
    pub fn transition(self, next: JobState) -> Result<JobState, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

/// Convert a server-reported fraction into a whole percentage.
///
/// Rounds half up and clamps into `0..=100`; non-finite input maps to 0.
pub fn progress_percent(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}
