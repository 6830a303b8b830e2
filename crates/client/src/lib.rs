//! HTTP client for the library server's bulk-download endpoints.
//!
//! - [`LibraryApi`] starts bulk-download tasks and queries their status.
//! - [`FileDownloader`] fetches finished archives into a local folder.
//! - [`StatusSource`] and [`ArtifactTransfer`] are the seams the job
//!   tracker depends on, so it can run against fakes in tests.

pub mod api;
pub mod config;
pub mod download;
pub mod error;

pub use api::{LibraryApi, StatusSource};
pub use config::ClientConfig;
pub use download::{ArtifactTransfer, FileDownloader};
pub use error::ClientError;
