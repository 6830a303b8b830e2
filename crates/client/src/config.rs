use std::path::PathBuf;
use std::time::Duration;

use crate::error::ClientError;

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "SHELFZIP_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "SHELFZIP_REQUEST_TIMEOUT_SECS";
pub const ENV_DOWNLOAD_DIR: &str = "SHELFZIP_DOWNLOAD_DIR";

/// Connection settings for one library server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL without a trailing slash, e.g. `https://books.example`.
    pub base_url: String,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Folder finished archives are written into.
    pub download_dir: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            download_dir: PathBuf::from("."),
        }
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                         | Default    |
    /// |---------------------------------|------------|
    /// | `SHELFZIP_BASE_URL`             | (required) |
    /// | `SHELFZIP_REQUEST_TIMEOUT_SECS` | `30`       |
    /// | `SHELFZIP_DOWNLOAD_DIR`         | `.`        |
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key/value source using the
    /// [`from_env`](Self::from_env) variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ClientError::Config(format!("{ENV_BASE_URL} is required")))?;

        let request_timeout_secs: u64 = match lookup(ENV_REQUEST_TIMEOUT_SECS) {
            Some(v) => v.trim().parse().map_err(|_| {
                ClientError::Config(format!(
                    "{ENV_REQUEST_TIMEOUT_SECS} must be a valid u64, got '{v}'"
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let download_dir = lookup(ENV_DOWNLOAD_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self::new(base_url)
            .with_request_timeout(Duration::from_secs(request_timeout_secs))
            .with_download_dir(download_dir))
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn new_strips_trailing_slashes() {
        let config = ClientConfig::new("http://books.local:8083/ ");
        assert_eq!(config.base_url, "http://books.local:8083");
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new("http://x");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.download_dir, PathBuf::from("."));
    }

    #[test]
    fn builder_overrides() {
        let config = ClientConfig::new("http://x")
            .with_download_dir("/tmp/zips")
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/zips"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn lookup_requires_base_url() {
        let result = ClientConfig::from_lookup(lookup_in(&[(ENV_DOWNLOAD_DIR, "/tmp")]));
        assert_matches!(result, Err(ClientError::Config(msg)) if msg.contains(ENV_BASE_URL));

        let blank = ClientConfig::from_lookup(lookup_in(&[(ENV_BASE_URL, "  ")]));
        assert_matches!(blank, Err(ClientError::Config(_)));
    }

    #[test]
    fn lookup_rejects_bad_timeout() {
        let result = ClientConfig::from_lookup(lookup_in(&[
            (ENV_BASE_URL, "http://x"),
            (ENV_REQUEST_TIMEOUT_SECS, "soon"),
        ]));
        assert_matches!(result, Err(ClientError::Config(msg)) if msg.contains("soon"));
    }

    #[test]
    fn lookup_reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup_in(&[
            (ENV_BASE_URL, "http://books.local/"),
            (ENV_REQUEST_TIMEOUT_SECS, "7"),
            (ENV_DOWNLOAD_DIR, "/srv/zips"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://books.local");
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert_eq!(config.download_dir, PathBuf::from("/srv/zips"));
    }

    #[test]
    fn lookup_falls_back_to_defaults() {
        let config = ClientConfig::from_lookup(lookup_in(&[(ENV_BASE_URL, "http://x")])).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.download_dir, PathBuf::from("."));
    }
}
