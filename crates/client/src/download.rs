//! Archive transfer: fetches a finished ZIP into the download folder.
//!
//! [`ArtifactTransfer::begin`] is fire-and-forget so the job tracker is
//! never held up by a large download. Transfers run on a
//! [`TaskTracker`]; call [`FileDownloader::wait`] before exiting to let
//! them finish and learn how many failed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::Url;
use shelfzip_core::target::validate_archive_filename;
use tokio::io::AsyncWriteExt;
use tokio_util::task::TaskTracker;

use crate::api::LibraryApi;
use crate::error::ClientError;

/// Suffix used while an archive is still being written.
const PARTIAL_SUFFIX: &str = ".part";

/// Starts the transfer of a finished artifact without blocking the caller.
pub trait ArtifactTransfer: Send + Sync {
    fn begin(&self, url: &str);
}

/// Downloads archives over HTTP into a local folder.
#[derive(Clone)]
pub struct FileDownloader {
    api: LibraryApi,
    download_dir: PathBuf,
    tasks: TaskTracker,
    /// Transfers started by `begin` that ended in an error.
    failed: Arc<AtomicUsize>,
}

impl FileDownloader {
    pub fn new(api: LibraryApi, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            download_dir: download_dir.into(),
            tasks: TaskTracker::new(),
            failed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Download the archive at `url` and return the path it was saved to.
    ///
    /// The file name is taken from the last URL path segment and must be
    /// a valid archive name. Data is streamed into a `.part` file that is
    /// renamed once complete and removed if the transfer fails.
    pub async fn download(&self, url: &str) -> Result<PathBuf, ClientError> {
        let url = self.api.resolve(url)?;
        let file_name = archive_filename(&url)?;
        let target = self.download_dir.join(&file_name);
        let partial = self.download_dir.join(format!("{file_name}{PARTIAL_SUFFIX}"));

        tracing::info!(url = %url, path = %target.display(), "Downloading archive");

        let response = self.api.http().get(url).send().await?;
        let response = LibraryApi::ensure_success(response).await?;

        match save_archive(response, &partial, &target).await {
            Ok(written) => {
                tracing::info!(path = %target.display(), bytes = written, "Archive saved");
                Ok(target)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %partial.display(), error = %cleanup, "Could not remove partial archive");
                    }
                }
                Err(e)
            }
        }
    }

    /// Wait for every transfer started through [`ArtifactTransfer::begin`].
    ///
    /// Returns how many of those transfers failed.
    pub async fn wait(&self) -> usize {
        self.tasks.close();
        self.tasks.wait().await;
        self.failed.load(Ordering::SeqCst)
    }
}

impl ArtifactTransfer for FileDownloader {
    fn begin(&self, url: &str) {
        let this = self.clone();
        let url = url.to_string();
        self.tasks.spawn(async move {
            if let Err(e) = this.download(&url).await {
                this.failed.fetch_add(1, Ordering::SeqCst);
                tracing::error!(url = %url, error = %e, "Archive download failed");
            }
        });
    }
}

/// Stream `response` into `partial`, then move it to `target`.
async fn save_archive(
    mut response: reqwest::Response,
    partial: &Path,
    target: &Path,
) -> Result<u64, ClientError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(partial, target).await?;
    Ok(written)
}

/// Derive the local file name from the last path segment of `url`.
pub fn archive_filename(url: &Url) -> Result<String, ClientError> {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let decoded = urlencoding::decode(segment).map_err(|e| ClientError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    validate_archive_filename(&decoded)?;
    Ok(decoded.into_owned())
}
