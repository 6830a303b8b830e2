use shelfzip_core::error::CoreError;

/// Errors from the library server HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, decode, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Server error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The initiation response carried no task id.
    #[error("No task ID returned")]
    MissingTaskId,

    /// A URL could not be built from the configured base URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Writing a downloaded archive to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
