//! Bulk-download targets and archive filename rules.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Archive names the server is willing to hand out.
static ARCHIVE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-\. ]+\.zip$").expect("valid regex"));

/// Path of the status endpoint, relative to the server base URL.
///
/// The task id is opaque and percent-encoded into a single path segment.
pub fn task_status_path(task_id: &str) -> String {
    format!("/ajax/task-status/{}", urlencoding::encode(task_id))
}

/// What to bundle into a ZIP archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadTarget {
    /// Every book by one author.
    Author(i64),
    /// Every book in one series.
    Series(i64),
}

impl DownloadTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Author(_) => "author",
            Self::Series(_) => "series",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Author(id) | Self::Series(id) => *id,
        }
    }

    /// Initiation path, relative to the server base URL.
    pub fn initiation_path(&self) -> String {
        format!("/{}/bulk-download/{}", self.kind(), self.id())
    }

    pub fn new(kind: &str, id: i64) -> Result<Self, CoreError> {
        match kind {
            "author" => Ok(Self::Author(id)),
            "series" => Ok(Self::Series(id)),
            other => Err(CoreError::Validation(format!(
                "Unknown download target kind: '{other}'. Valid kinds: author, series"
            ))),
        }
    }
}

impl fmt::Display for DownloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Parses `author:12` / `series:7`.
impl FromStr for DownloadTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s.split_once(':').ok_or_else(|| {
            CoreError::Validation(format!("Expected '<kind>:<id>', got: '{s}'"))
        })?;
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("Invalid target id: '{id}'")))?;
        Self::new(kind.trim(), id)
    }
}

/// Validate the file name of a downloaded archive.
pub fn validate_archive_filename(name: &str) -> Result<(), CoreError> {
    if ARCHIVE_NAME_RE.is_match(name) && name != ".zip" {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid archive file name: '{name}'"
        )))
    }
}
