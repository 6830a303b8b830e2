//! `shelfzip` -- bulk ZIP downloads from a library server.
//!
//! Starts one bulk-download job per target (`author:12`, `series:7`),
//! follows each job until it finishes, and saves the finished archives
//! into the download folder. The `--base-url`, `--download-dir` and
//! `--timeout-secs` flags override the matching variables below.
//!
//! # Environment variables
//!
//! | Variable                        | Required | Default | Description                      |
//! |---------------------------------|----------|---------|----------------------------------|
//! | `SHELFZIP_BASE_URL`             | yes      | --      | Library server, e.g. `http://books.local:8083` |
//! | `SHELFZIP_DOWNLOAD_DIR`         | no       | `.`     | Folder archives are saved into   |
//! | `SHELFZIP_REQUEST_TIMEOUT_SECS` | no       | `30`    | Per-request HTTP timeout         |
//! | `SHELFZIP_POLL_INTERVAL_MS`     | no       | `2000`  | Status poll interval             |
//! | `RUST_LOG`                      | no       | `shelfzip=info` | Log filter               |

mod display;
mod render;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use indicatif::{MultiProgress, ProgressDrawTarget};
use shelfzip_client::config as client_config;
use shelfzip_client::{ClientConfig, ClientError, FileDownloader, LibraryApi};
use shelfzip_core::target::DownloadTarget;
use shelfzip_core::types::JobId;
use shelfzip_notify::ToastBoard;
use shelfzip_tracker::{JobTracker, ProgressDisplay, TrackerConfig, TrackerEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::display::BarDisplay;

#[derive(Parser)]
#[command(name = "shelfzip", about = "Download every book of an author or series as a ZIP")]
struct Cli {
    /// Library server base URL [env: SHELFZIP_BASE_URL].
    #[arg(long)]
    base_url: Option<String>,

    /// Folder finished archives are saved into [env: SHELFZIP_DOWNLOAD_DIR].
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds [env: SHELFZIP_REQUEST_TIMEOUT_SECS].
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Emit JSON log lines and hide progress bars.
    #[arg(long)]
    json: bool,

    /// What to bundle, e.g. `author:12` or `series:7`.
    #[arg(value_name = "TARGET", required = true, num_args = 1..)]
    targets: Vec<DownloadTarget>,
}

impl Cli {
    /// Command-line value for a client config variable, if the flag was given.
    fn flag_for(&self, key: &str) -> Option<String> {
        match key {
            client_config::ENV_BASE_URL => self.base_url.clone(),
            client_config::ENV_DOWNLOAD_DIR => self
                .download_dir
                .as_ref()
                .map(|dir| dir.display().to_string()),
            client_config::ENV_REQUEST_TIMEOUT_SECS => self.timeout_secs.map(|s| s.to_string()),
            _ => None,
        }
    }

    /// Client settings from the environment, with flags taking precedence.
    fn client_config(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ClientConfig, ClientError> {
        ClientConfig::from_lookup(|key| self.flag_for(key).or_else(|| env(key)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = cli.client_config(|key| std::env::var(key).ok())?;
    let targets = cli.targets;
    tokio::fs::create_dir_all(&config.download_dir).await?;

    let api = LibraryApi::new(&config)?;
    let downloader = FileDownloader::new(api.clone(), &config.download_dir);
    let board = ToastBoard::new();
    let renderer = render::spawn(&board);
    let tracker = JobTracker::new(
        Arc::new(api.clone()),
        Arc::new(board.clone()),
        Arc::new(downloader.clone()),
        TrackerConfig::from_env(),
    );

    tracing::info!(
        base_url = %config.base_url,
        download_dir = %config.download_dir.display(),
        jobs = targets.len(),
        "Starting bulk downloads",
    );

    // Subscribe before starting so no terminal event is missed.
    let mut events = tracker.subscribe();
    let bars = if cli.json {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };

    let starts = targets.into_iter().map(|target| {
        let display: Arc<dyn ProgressDisplay> = Arc::new(BarDisplay::new(&bars, target.to_string()));
        let tracker = tracker.clone();
        let api = api.clone();
        async move { tracker.start_download(&api, target, Some(display)).await }
    });
    let started = futures::future::join_all(starts).await;

    let mut failures = started.iter().filter(|r| r.is_err()).count();
    let mut pending: HashSet<JobId> = started.into_iter().filter_map(Result::ok).collect();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while !pending.is_empty() {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::warn!(pending = pending.len(), "Interrupted, cancelling downloads");
                for job_id in &pending {
                    tracker.cancel(job_id);
                }
                failures += pending.len();
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if matches!(event, TrackerEvent::Failed { .. }) {
                        failures += 1;
                    }
                    if event.is_terminal() {
                        if let Some(job_id) = event.job_id() {
                            pending.remove(job_id);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed tracker events, re-checking jobs");
                    pending.retain(|job_id| tracker.is_tracking(job_id));
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracker.shutdown().await;
    let failed_transfers = downloader.wait().await;
    renderer.abort();

    if failed_transfers > 0 {
        tracing::error!(failed_transfers, "Some archives could not be saved");
        failures += failed_transfers;
    }

    if failures > 0 {
        anyhow::bail!("{failures} bulk download(s) did not complete");
    }
    tracing::info!(download_dir = %config.download_dir.display(), "All downloads finished");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shelfzip=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}
