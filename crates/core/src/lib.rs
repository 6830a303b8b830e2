//! Shared domain types for the shelfzip bulk-download tracker.
//!
//! Everything here is pure: identifiers, the job state machine, the
//! wire shapes of the library server's initiation and status
//! endpoints, download targets, and the user-facing message texts.

pub mod error;
pub mod job;
pub mod messages;
pub mod target;
pub mod types;
pub mod wire;
