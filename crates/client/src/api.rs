//! REST client for the library server's bulk-download endpoints.
//!
//! Wraps task initiation (`GET /author/bulk-download/{id}`,
//! `GET /series/bulk-download/{id}`) and status polling
//! (`GET /ajax/task-status/{task_id}`) using [`reqwest`].

use async_trait::async_trait;
use reqwest::Url;
use shelfzip_core::target::{task_status_path, DownloadTarget};
use shelfzip_core::types::JobId;
use shelfzip_core::wire::{Initiation, InitiationResponse, TaskStatusResponse};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Header the server checks to answer with JSON instead of a redirect.
const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

/// Anything that can report the current status of a task.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn task_status(&self, job_id: &JobId) -> Result<TaskStatusResponse, ClientError>;
}

/// HTTP client for a single library server.
#[derive(Clone)]
pub struct LibraryApi {
    client: reqwest::Client,
    base_url: String,
}

impl LibraryApi {
    /// Create a client with the configured request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server to start building the archive for `target`.
    pub async fn initiate(&self, target: DownloadTarget) -> Result<Initiation, ClientError> {
        self.initiate_url(&target.initiation_path()).await
    }

    /// Start a task through an arbitrary initiation endpoint.
    ///
    /// `url` may be absolute or relative to the base URL. Fails with
    /// [`ClientError::MissingTaskId`] when the server queued nothing.
    pub async fn initiate_url(&self, url: &str) -> Result<Initiation, ClientError> {
        let url = self.resolve(url)?;
        tracing::debug!(url = %url, "Requesting bulk download");

        let response = self
            .client
            .get(url)
            .header(REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE)
            .send()
            .await?;

        let body: InitiationResponse = Self::parse_response(response).await?;
        let initiation = body.into_initiation().ok_or(ClientError::MissingTaskId)?;

        tracing::info!(task_id = %initiation.job_id, "Bulk download task queued");
        Ok(initiation)
    }

    /// Fetch the current status of a task.
    pub async fn task_status(&self, job_id: &JobId) -> Result<TaskStatusResponse, ClientError> {
        let url = self.resolve(&task_status_path(job_id.as_str()))?;
        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    /// Resolve `url` against the base URL. Absolute URLs pass through.
    pub fn resolve(&self, url: &str) -> Result<Url, ClientError> {
        let base =
            Url::parse(&format!("{}/", self.base_url)).map_err(|e| invalid_url(url, e))?;
        base.join(url).map_err(|e| invalid_url(url, e))
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, otherwise turn it
    /// into a [`ClientError::Api`] carrying the body text.
    pub(crate) async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }
}

fn invalid_url(url: &str, reason: impl std::fmt::Display) -> ClientError {
    ClientError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl StatusSource for LibraryApi {
    async fn task_status(&self, job_id: &JobId) -> Result<TaskStatusResponse, ClientError> {
        LibraryApi::task_status(self, job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> LibraryApi {
        LibraryApi::with_client(reqwest::Client::new(), base)
    }

    #[test]
    fn resolve_relative_path() {
        let url = api("http://books.local:8083").resolve("/ajax/task-status/abc").unwrap();
        assert_eq!(url.as_str(), "http://books.local:8083/ajax/task-status/abc");
    }

    #[test]
    fn resolve_keeps_absolute_urls() {
        let url = api("http://books.local")
            .resolve("https://cdn.example/download-bulk/a.zip")
            .unwrap();
        assert_eq!(url.as_str(), "https://cdn.example/download-bulk/a.zip");
    }

    #[test]
    fn resolve_rejects_bad_base() {
        let err = api("not a url").resolve("/x").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(api("http://h/").base_url(), "http://h");
    }
}
