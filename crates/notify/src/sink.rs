use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Duration meaning "never auto-remove".
pub const PERSISTENT: Duration = Duration::ZERO;

/// Visual category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
    /// A transfer that is still in progress.
    Download,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Download => "download",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Success => "✔",
            Self::Warning => "⚠",
            Self::Error => "✖",
            Self::Download => "⬇",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Displays, updates and dismisses messages keyed by an opaque id.
///
/// Implementations must treat `update` and `remove` on an unknown id as
/// a no-op. None of the calls may block.
pub trait NotificationSink: Send + Sync {
    /// Create a notification, replacing any existing one with the same id.
    ///
    /// A zero `duration` ([`PERSISTENT`]) keeps it until removed. When
    /// `id` is `None` the sink assigns one. Returns the id in use.
    fn show(
        &self,
        message: &str,
        kind: NotificationKind,
        duration: Duration,
        id: Option<&str>,
    ) -> String;

    /// Change the message (and optionally the kind) of a notification in place.
    fn update(&self, id: &str, message: &str, kind: Option<NotificationKind>);

    /// Dismiss a notification.
    fn remove(&self, id: &str);
}
