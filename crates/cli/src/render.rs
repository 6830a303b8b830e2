//! Renders toast board changes as log lines.

use shelfzip_notify::{NotificationKind, ToastBoard, ToastChange};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Follow `board` until the returned task is aborted.
pub fn spawn(board: &ToastBoard) -> JoinHandle<()> {
    let mut changes = board.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => log_change(&change),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification renderer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_change(change: &ToastChange) {
    let toast = match change {
        ToastChange::Shown(toast) | ToastChange::Updated(toast) => toast,
        ToastChange::Removed { id } => {
            tracing::debug!(toast_id = %id, "Notification dismissed");
            return;
        }
    };

    let line = toast.render();
    match toast.kind {
        NotificationKind::Error => tracing::error!(toast_id = %toast.id, "{line}"),
        NotificationKind::Warning => tracing::warn!(toast_id = %toast.id, "{line}"),
        NotificationKind::Info | NotificationKind::Success | NotificationKind::Download => {
            tracing::info!(toast_id = %toast.id, "{line}")
        }
    }
}
