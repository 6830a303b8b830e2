//! Per-job status poller.
//!
//! Each tracked job owns exactly one [`PollHandle`]. The handle holds the
//! poller task and a child cancellation token; dropping the handle is the
//! single release point, so a job that leaves the registry always stops
//! its poller exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use shelfzip_client::StatusSource;
use shelfzip_core::types::JobId;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::tracker::Shared;

/// Smallest accepted poll interval; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Ownership token for one job's recurring status poll.
pub struct PollHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    live: Arc<AtomicUsize>,
}

impl PollHandle {
    /// Spawn the poll loop for `job_id` on the current runtime.
    ///
    /// `parent` is the tracker's master token; the poller runs under a
    /// child of it so shutdown reaches every job at once.
    pub(crate) fn spawn(
        shared: Weak<Shared>,
        source: Arc<dyn StatusSource>,
        job_id: JobId,
        interval: Duration,
        parent: &CancellationToken,
        live: Arc<AtomicUsize>,
    ) -> Self {
        let cancel = parent.child_token();
        live.fetch_add(1, Ordering::SeqCst);

        let task = tokio::spawn(run_poll_loop(
            shared,
            source,
            job_id.clone(),
            interval.max(MIN_POLL_INTERVAL),
            cancel.clone(),
        ));

        Self {
            job_id,
            cancel,
            task: Some(task),
            live,
        }
    }

    /// Stop polling and wait up to `timeout` for the task to exit.
    pub async fn stop_and_join(mut self, timeout: Duration) {
        let task = self.task.take();
        drop(self);
        if let Some(task) = task {
            let _ = tokio::time::timeout(timeout, task).await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(task_id = %self.job_id, "Poller stopped");
    }
}

impl std::fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollHandle")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Issue one status request per interval until cancelled.
///
/// Requests are not serialised: a slow response does not delay the next
/// tick. Every request carries its tick number so the registry can drop
/// responses that arrive after a newer one was applied. Pending requests
/// are dropped with the task on cancellation.
async fn run_poll_loop(
    shared: Weak<Shared>,
    source: Arc<dyn StatusSource>,
    job_id: JobId,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight = FuturesUnordered::new();
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            Some((tick, result)) = in_flight.next(), if !in_flight.is_empty() => {
                let Some(shared) = shared.upgrade() else { break };
                shared.apply_tick(&job_id, tick, result);
            }

            _ = ticker.tick() => {
                seq += 1;
                let tick = seq;
                let source = Arc::clone(&source);
                let id = job_id.clone();
                tracing::trace!(task_id = %job_id, tick, "Polling task status");
                in_flight.push(async move { (tick, source.task_status(&id).await) });
            }
        }
    }

    tracing::debug!(task_id = %job_id, dropped = in_flight.len(), "Poll loop exited");
}
