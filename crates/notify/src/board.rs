//! In-memory toast board.
//!
//! [`ToastBoard`] keeps the currently visible toasts, removes timed ones
//! when their duration elapses, and publishes every change on a
//! [`tokio::sync::broadcast`] channel so a renderer can follow along.
//! Cloning the board is cheap; clones share state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::sink::{NotificationKind, NotificationSink};

/// Buffer capacity of the change feed.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A visible notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Toast {
    /// One-line rendering: icon followed by the message.
    pub fn render(&self) -> String {
        format!("{} {}", self.kind.icon(), self.message)
    }
}

/// A change to the board, published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ToastChange {
    Shown(Toast),
    Updated(Toast),
    Removed { id: String },
}

struct Entry {
    toast: Toast,
    /// Distinguishes this entry from a later one shown under the same id.
    generation: u64,
    /// Stops the auto-removal timer, if any.
    timer: Option<CancellationToken>,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Entry>,
    next_generation: u64,
}

struct Inner {
    entries: Mutex<Entries>,
    changes: broadcast::Sender<ToastChange>,
}

/// Shared, in-memory [`NotificationSink`].
#[derive(Clone)]
pub struct ToastBoard {
    inner: Arc<Inner>,
}

impl ToastBoard {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(Entries::default()),
                changes,
            }),
        }
    }

    /// Subscribe to every subsequent change on the board.
    pub fn subscribe(&self) -> broadcast::Receiver<ToastChange> {
        self.inner.changes.subscribe()
    }

    pub fn get(&self, id: &str) -> Option<Toast> {
        self.lock().map.get(id).map(|e| e.toast.clone())
    }

    /// All visible toasts, oldest first.
    pub fn snapshot(&self) -> Vec<Toast> {
        let mut toasts: Vec<Toast> = self.lock().map.values().map(|e| e.toast.clone()).collect();
        toasts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        toasts
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, change: ToastChange) {
        // No subscribers is fine.
        let _ = self.inner.changes.send(change);
    }

    /// Spawn the auto-removal timer for one entry generation.
    ///
    /// Returns `None` outside a tokio runtime; the toast then stays until
    /// removed explicitly.
    fn spawn_timer(&self, id: &str, generation: u64, duration: Duration) -> Option<CancellationToken> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(toast_id = %id, "No runtime for toast timer, keeping toast");
                return None;
            }
        };

        let token = CancellationToken::new();
        let cancel = token.clone();
        let board = self.clone();
        let id = id.to_string();
        handle.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(duration) => board.expire(&id, generation),
            }
        });
        Some(token)
    }

    /// Remove `id` only if it is still the generation the timer was armed for.
    fn expire(&self, id: &str, generation: u64) {
        let removed = {
            let mut entries = self.lock();
            let current = entries
                .map
                .get(id)
                .is_some_and(|entry| entry.generation == generation);
            if current {
                entries.map.remove(id)
            } else {
                None
            }
        };
        if removed.is_some() {
            tracing::debug!(toast_id = %id, "Toast expired");
            self.publish(ToastChange::Removed { id: id.to_string() });
        }
    }
}

impl Default for ToastBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for ToastBoard {
    fn show(
        &self,
        message: &str,
        kind: NotificationKind,
        duration: Duration,
        id: Option<&str>,
    ) -> String {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = Utc::now();
        let toast = Toast {
            id: id.clone(),
            message: message.to_string(),
            kind,
            created_at: now,
            updated_at: now,
        };

        let generation = {
            let mut entries = self.lock();
            entries.next_generation += 1;
            let generation = entries.next_generation;
            let previous = entries.map.insert(
                id.clone(),
                Entry {
                    toast: toast.clone(),
                    generation,
                    timer: None,
                },
            );
            if let Some(timer) = previous.and_then(|p| p.timer) {
                timer.cancel();
            }
            generation
        };

        if !duration.is_zero() {
            if let Some(timer) = self.spawn_timer(&id, generation, duration) {
                let mut entries = self.lock();
                match entries.map.get_mut(&id) {
                    Some(entry) if entry.generation == generation => entry.timer = Some(timer),
                    _ => timer.cancel(),
                }
            }
        }

        tracing::debug!(toast_id = %id, kind = %kind, text = message, "Toast shown");
        self.publish(ToastChange::Shown(toast));
        id
    }

    fn update(&self, id: &str, message: &str, kind: Option<NotificationKind>) {
        let updated = {
            let mut entries = self.lock();
            entries.map.get_mut(id).map(|entry| {
                entry.toast.message = message.to_string();
                if let Some(kind) = kind {
                    entry.toast.kind = kind;
                }
                entry.toast.updated_at = Utc::now();
                entry.toast.clone()
            })
        };
        if let Some(toast) = updated {
            tracing::debug!(toast_id = %id, kind = %toast.kind, text = message, "Toast updated");
            self.publish(ToastChange::Updated(toast));
        }
    }

    fn remove(&self, id: &str) {
        let removed = self.lock().map.remove(id);
        if let Some(entry) = removed {
            if let Some(timer) = entry.timer {
                timer.cancel();
            }
            tracing::debug!(toast_id = %id, "Toast removed");
            self.publish(ToastChange::Removed { id: id.to_string() });
        }
    }
}
