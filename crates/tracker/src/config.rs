use std::time::Duration;

/// Interval between status polls of one job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// How long the "failed to start" toast stays up.
pub const DEFAULT_INITIATION_ERROR_DURATION: Duration = Duration::from_millis(5000);

/// Delay before the "ready" toast is removed once the transfer started.
pub const DEFAULT_SUCCESS_GRACE: Duration = Duration::from_millis(3000);

/// Delay before a "failed" toast is removed.
pub const DEFAULT_FAILURE_GRACE: Duration = Duration::from_millis(5000);

/// How long shutdown waits for each poller task to exit.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Timing knobs for [`JobTracker`](crate::JobTracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    pub initiation_error_duration: Duration,
    pub success_grace: Duration,
    pub failure_grace: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            initiation_error_duration: DEFAULT_INITIATION_ERROR_DURATION,
            success_grace: DEFAULT_SUCCESS_GRACE,
            failure_grace: DEFAULT_FAILURE_GRACE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl TrackerConfig {
    /// Load timings from environment variables, falling back to defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `SHELFZIP_POLL_INTERVAL_MS` | `2000`  |
    /// | `SHELFZIP_ERROR_TOAST_MS`   | `5000`  |
    /// | `SHELFZIP_SUCCESS_GRACE_MS` | `3000`  |
    /// | `SHELFZIP_FAILURE_GRACE_MS` | `5000`  |
    ///
    /// Unparseable or zero values are ignored with a warning.
    pub fn from_env() -> Self {
        Self {
            poll_interval: env_millis("SHELFZIP_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL),
            initiation_error_duration: env_millis(
                "SHELFZIP_ERROR_TOAST_MS",
                DEFAULT_INITIATION_ERROR_DURATION,
            ),
            success_grace: env_millis("SHELFZIP_SUCCESS_GRACE_MS", DEFAULT_SUCCESS_GRACE),
            failure_grace: env_millis("SHELFZIP_FAILURE_GRACE_MS", DEFAULT_FAILURE_GRACE),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

fn env_millis(var: &str, default: Duration) -> Duration {
    match std::env::var(var) {
        Ok(raw) => parse_millis(&raw).unwrap_or_else(|| {
            tracing::warn!(var, value = %raw, "Ignoring invalid duration, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Parse a positive millisecond count.
fn parse_millis(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
    }
}
