//! User-facing notification texts.

/// Shown when the server accepted a job but sent no message of its own.
pub const MSG_PREPARING: &str = "Preparing ZIP file...";

/// Shown when the archive is ready and the transfer has been triggered.
pub const MSG_READY_DOWNLOADING: &str = "ZIP file ready! Download starting...";

/// Shown when the archive is ready but the server gave no download URL.
pub const MSG_READY_MANUAL: &str = "ZIP file ready! Click to download.";

/// Fallback failure reason when the server reports none.
pub const UNKNOWN_ERROR: &str = "Unknown error";

pub fn progress_message(percent: u8) -> String {
    format!("Creating ZIP file... {percent}%")
}

pub fn failed_message(reason: Option<&str>) -> String {
    let reason = reason.filter(|r| !r.is_empty()).unwrap_or(UNKNOWN_ERROR);
    format!("Download failed: {reason}")
}

pub fn initiation_failed_message(reason: &str) -> String {
    format!("Failed to start download: {reason}")
}
