//! Bulk-download job tracker.
//!
//! [`JobTracker`] owns the registry of in-flight jobs. Starting a job
//! registers it, opens a persistent notification keyed by
//! [`JobId::notification_key`], and spawns its [`PollHandle`]. Each poll
//! response is applied inside one critical section of the registry lock:
//! progress updates, then terminal handling (transfer trigger or error
//! notification), then removal. Sink, display and transfer calls happen
//! under that lock and must not block.
//!
//! Lifecycle events are broadcast via a [`tokio::sync::broadcast`]
//! channel. Call [`JobTracker::subscribe`] to receive them.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use shelfzip_client::{ArtifactTransfer, ClientError, LibraryApi, StatusSource};
use shelfzip_core::job::{progress_percent, JobState};
use shelfzip_core::messages::{
    failed_message, initiation_failed_message, progress_message, MSG_PREPARING,
    MSG_READY_DOWNLOADING, MSG_READY_MANUAL, UNKNOWN_ERROR,
};
use shelfzip_core::target::DownloadTarget;
use shelfzip_core::types::JobId;
use shelfzip_core::wire::{Initiation, TaskPhase, TaskStatusResponse};
use shelfzip_notify::{NotificationKind, NotificationSink, PERSISTENT};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::TrackerConfig;
use crate::display::ProgressDisplay;
use crate::error::TrackerError;
use crate::events::TrackerEvent;
use crate::poller::PollHandle;
use crate::registry::{Job, JobRegistry, JobSnapshot};

/// Broadcast channel capacity for tracker events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Tracks bulk-download jobs from initiation to a terminal state.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct JobTracker {
    shared: Arc<Shared>,
}

/// State shared between the tracker handle and its poller tasks.
pub(crate) struct Shared {
    registry: Mutex<JobRegistry>,
    status: Arc<dyn StatusSource>,
    sink: Arc<dyn NotificationSink>,
    transfer: Arc<dyn ArtifactTransfer>,
    config: TrackerConfig,
    event_tx: broadcast::Sender<TrackerEvent>,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
    /// Number of poll handles not yet released.
    live_pollers: Arc<AtomicUsize>,
    /// Pending notification-removal timers.
    timers: TaskTracker,
}

impl JobTracker {
    pub fn new(
        status: Arc<dyn StatusSource>,
        sink: Arc<dyn NotificationSink>,
        transfer: Arc<dyn ArtifactTransfer>,
        config: TrackerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(JobRegistry::default()),
                status,
                sink,
                transfer,
                config,
                event_tx,
                cancel: CancellationToken::new(),
                live_pollers: Arc::new(AtomicUsize::new(0)),
                timers: TaskTracker::new(),
            }),
        }
    }

    /// Subscribe to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    /// Start a job and begin polling it.
    ///
    /// `display`, if given, is put into its busy state before `initiate`
    /// runs and restored when the job ends (or fails to start). On error
    /// nothing is registered and a transient error notification is shown.
    pub async fn start<F, Fut, E>(
        &self,
        initiate: F,
        display: Option<Arc<dyn ProgressDisplay>>,
    ) -> Result<JobId, TrackerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Initiation, E>>,
        E: Display,
    {
        if let Some(display) = &display {
            display.begin();
        }

        if self.shared.cancel.is_cancelled() {
            return Err(self.shared.start_failed(display.as_deref(), TrackerError::ShutDown));
        }

        let initiation = match initiate().await {
            Ok(initiation) => initiation,
            Err(e) => {
                let err = TrackerError::Initiation(e.to_string());
                return Err(self.shared.start_failed(display.as_deref(), err));
            }
        };

        self.shared.register(initiation, display)
    }

    /// Start a bulk download of `target` through `api`.
    pub async fn start_download(
        &self,
        api: &LibraryApi,
        target: DownloadTarget,
        display: Option<Arc<dyn ProgressDisplay>>,
    ) -> Result<JobId, TrackerError> {
        tracing::debug!(%target, "Requesting bulk download");
        self.start(move || api.initiate(target), display).await
    }

    /// Cancel a tracked job.
    ///
    /// Stops its poller, restores its display and removes its notification
    /// at once. Returns `false` (and changes nothing) if `job_id` is not
    /// tracked.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        let mut registry = self.shared.lock();
        let Some(mut job) = registry.remove(job_id) else {
            tracing::debug!(task_id = %job_id, "Cancel for untracked job ignored");
            return false;
        };
        self.shared.cancel_job(&mut job);
        true
    }

    pub fn is_tracking(&self, job_id: &JobId) -> bool {
        self.shared.lock().contains(job_id)
    }

    pub fn job(&self, job_id: &JobId) -> Option<JobSnapshot> {
        self.shared.lock().get(job_id).map(Job::snapshot)
    }

    /// Snapshots of every tracked job, oldest first.
    pub fn active_jobs(&self) -> Vec<JobSnapshot> {
        self.shared.lock().snapshots()
    }

    /// Number of poll handles that have not been released.
    pub fn active_pollers(&self) -> usize {
        self.shared.live_pollers.load(Ordering::SeqCst)
    }

    /// Cancel every job and wait for pollers and timers to exit.
    ///
    /// Later calls to [`start`](Self::start) fail with
    /// [`TrackerError::ShutDown`].
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job tracker");
        self.shared.cancel.cancel();

        let jobs = self.shared.lock().drain();
        let timeout = self.shared.config.shutdown_timeout;
        for mut job in jobs {
            let handle = job.release_poller();
            self.shared.cancel_job(&mut job);
            if let Some(handle) = handle {
                handle.stop_and_join(timeout).await;
            }
        }

        self.shared.timers.close();
        if tokio::time::timeout(timeout, self.shared.timers.wait())
            .await
            .is_err()
        {
            tracing::warn!("Notification timers did not stop in time");
        }

        tracing::info!("Job tracker shut down complete");
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, JobRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TrackerEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Register an accepted job and spawn its poller.
    fn register(
        self: &Arc<Self>,
        initiation: Initiation,
        display: Option<Arc<dyn ProgressDisplay>>,
    ) -> Result<JobId, TrackerError> {
        let Initiation { job_id, message } = initiation;
        let mut registry = self.lock();

        if self.cancel.is_cancelled() {
            drop(registry);
            return Err(self.start_failed(display.as_deref(), TrackerError::ShutDown));
        }

        if registry.contains(&job_id) {
            tracing::warn!(task_id = %job_id, "Server returned a job id that is already tracked");
            if let Some(display) = &display {
                display.restore();
            }
            return Ok(job_id);
        }

        let mut job = Job::new(job_id.clone(), display);
        enter(&mut job, JobState::Polling);

        let key = job_id.notification_key();
        let message = message.as_deref().unwrap_or(MSG_PREPARING);
        self.sink
            .show(message, NotificationKind::Download, PERSISTENT, Some(key.as_str()));

        job.poll = Some(PollHandle::spawn(
            Arc::downgrade(self),
            Arc::clone(&self.status),
            job_id.clone(),
            self.config.poll_interval,
            &self.cancel,
            Arc::clone(&self.live_pollers),
        ));

        registry.insert(job);

        tracing::info!(
            task_id = %job_id,
            text = message,
            tracked = registry.len(),
            "Tracking bulk download",
        );
        self.emit(TrackerEvent::Started {
            job_id: job_id.clone(),
        });
        Ok(job_id)
    }

    /// Report a failed start and return `err` for the caller.
    fn start_failed(&self, display: Option<&dyn ProgressDisplay>, err: TrackerError) -> TrackerError {
        let reason = match &err {
            TrackerError::Initiation(reason) => reason.clone(),
            other => other.to_string(),
        };
        tracing::error!(error = %reason, "Failed to start bulk download");

        if let Some(display) = display {
            display.restore();
        }
        self.sink.show(
            &initiation_failed_message(&reason),
            NotificationKind::Error,
            self.config.initiation_error_duration,
            None,
        );
        self.emit(TrackerEvent::StartFailed { reason });
        err
    }

    /// Apply the response of poll tick `tick` for `job_id`.
    ///
    /// Responses for jobs that are no longer polling, or older than a tick
    /// already applied, are dropped.
    pub(crate) fn apply_tick(
        &self,
        job_id: &JobId,
        tick: u64,
        result: Result<TaskStatusResponse, ClientError>,
    ) {
        let mut registry = self.lock();
        let Some(job) = registry.accept_tick(job_id, tick) else {
            tracing::debug!(task_id = %job_id, tick, "Dropping stale status response");
            return;
        };

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(task_id = %job_id, error = %e, "Status request failed");
                let reason = e.to_string();
                self.finish(&mut registry, job_id, Outcome::Failed(Some(reason)));
                return;
            }
        };

        if let Some(fraction) = status.progress {
            self.report_progress(job, fraction);
        }

        match status.phase() {
            TaskPhase::Running => {}
            TaskPhase::Completed => {
                let url = status.download_url.filter(|url| !url.is_empty());
                self.finish(&mut registry, job_id, Outcome::Completed(url));
            }
            TaskPhase::Failed => {
                self.finish(&mut registry, job_id, Outcome::Failed(status.error));
            }
        }
    }

    fn report_progress(&self, job: &mut Job, fraction: f64) {
        job.progress = fraction;
        let percent = progress_percent(fraction);

        if let Some(display) = &job.display {
            display.set_percent(percent);
        }
        self.sink.update(
            &job.id.notification_key(),
            &progress_message(percent),
            Some(NotificationKind::Download),
        );

        tracing::debug!(task_id = %job.id, percent, "Bulk download progress");
        self.emit(TrackerEvent::Progress {
            job_id: job.id.clone(),
            percent,
        });
    }

    /// Terminal handling: release the poller, dispatch side effects, then
    /// drop the job from the registry.
    fn finish(&self, registry: &mut JobRegistry, job_id: &JobId, outcome: Outcome) {
        let Some(job) = registry.get_unfinished_mut(job_id) else {
            return;
        };
        drop(job.release_poller());
        if let Some(display) = &job.display {
            display.restore();
        }

        let key = job_id.notification_key();
        let event = match outcome {
            Outcome::Completed(url) => {
                enter(job, JobState::Completed);
                job.result_ref = url.clone();
                match &url {
                    Some(url) => {
                        self.sink.update(
                            &key,
                            MSG_READY_DOWNLOADING,
                            Some(NotificationKind::Success),
                        );
                        self.transfer.begin(url);
                        self.schedule_removal(key, self.config.success_grace);
                    }
                    None => {
                        self.sink
                            .update(&key, MSG_READY_MANUAL, Some(NotificationKind::Success));
                    }
                }
                tracing::info!(task_id = %job_id, download_url = ?url, "Bulk download ready");
                TrackerEvent::Completed {
                    job_id: job_id.clone(),
                    download_url: url,
                }
            }
            Outcome::Failed(reason) => {
                enter(job, JobState::Failed);
                let reason = reason
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                let message = failed_message(Some(&reason));
                self.sink
                    .update(&key, &message, Some(NotificationKind::Error));
                self.schedule_removal(key, self.config.failure_grace);
                tracing::error!(task_id = %job_id, text = %message, "Bulk download failed");
                TrackerEvent::Failed {
                    job_id: job_id.clone(),
                    reason,
                }
            }
        };

        registry.remove(job_id);
        self.emit(event);
    }

    /// Cancellation side effects for a job already taken out of the registry.
    fn cancel_job(&self, job: &mut Job) {
        drop(job.release_poller());
        enter(job, JobState::Cancelled);
        if let Some(display) = &job.display {
            display.restore();
        }
        self.sink.remove(&job.id.notification_key());

        tracing::info!(task_id = %job.id, "Bulk download cancelled");
        self.emit(TrackerEvent::Cancelled {
            job_id: job.id.clone(),
        });
    }

    /// Remove the notification `key` after `delay`, unless shut down first.
    fn schedule_removal(&self, key: String, delay: Duration) {
        let sink = Arc::clone(&self.sink);
        let cancel = self.cancel.clone();
        self.timers.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => sink.remove(&key),
            }
        });
    }
}

/// How a polled job ended.
enum Outcome {
    /// Carries the download URL, if the server sent one.
    Completed(Option<String>),
    /// Carries the failure reason, if known.
    Failed(Option<String>),
}

/// Move `job` to `next`, logging illegal moves instead of applying them.
fn enter(job: &mut Job, next: JobState) {
    match job.state.transition(next) {
        Ok(state) => job.state = state,
        Err(e) => tracing::warn!(task_id = %job.id, error = %e, "Unexpected job state change"),
    }
}
