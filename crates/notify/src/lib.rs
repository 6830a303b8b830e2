//! Transient user notifications ("toasts") keyed by an opaque id.
//!
//! - [`NotificationSink`]: the three-call contract the job tracker
//!   drives: `show`, `update`, `remove`.
//! - [`ToastBoard`]: in-memory sink with auto-removal timers and a
//!   broadcast change feed for renderers.

pub mod board;
pub mod sink;

pub use board::{Toast, ToastBoard, ToastChange};
pub use sink::{NotificationKind, NotificationSink, PERSISTENT};
