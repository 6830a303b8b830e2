use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Prefix of the notification key derived from a job id.
const NOTIFICATION_KEY_PREFIX: &str = "download-";

/// Server-assigned identifier of a bulk-download task.
///
/// Opaque to the client. The server may send it as a JSON string or
/// integer; both are normalised to the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this job's toast lives in a notification sink.
    pub fn notification_key(&self) -> String {
        format!("{NOTIFICATION_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobId {
    Text(String),
    Number(u64),
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawJobId::deserialize(deserializer)? {
            RawJobId::Text(s) => Self(s),
            RawJobId::Number(n) => Self(n.to_string()),
        })
    }
}
