//! Client-side tracker for long-running bulk-download jobs.
//!
//! [`JobTracker`] starts a job on the library server, polls its status
//! on a fixed interval, mirrors progress into a [`NotificationSink`]
//! and an optional [`ProgressDisplay`], and on completion triggers the
//! archive transfer. Every exit path (success, failure, transport
//! error, cancellation, shutdown) releases the job's poller exactly once.
//!
//! [`NotificationSink`]: shelfzip_notify::NotificationSink

pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod poller;
pub mod registry;
pub mod tracker;

pub use config::TrackerConfig;
pub use display::ProgressDisplay;
pub use error::TrackerError;
pub use events::TrackerEvent;
pub use poller::PollHandle;
pub use registry::JobSnapshot;
pub use tracker::JobTracker;
