//! Upload progress reporting.

use crate::UploadPhase;
use std::path::Path;
use tracing::debug;

/// Bytes handed to the transport so far, out of the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes sent.
    pub bytes_sent: u64,
    /// File size.
    pub total: u64,
}

impl UploadProgress {
    /// Completed share in percent, 100 for an empty file.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.bytes_sent as f64 * 100.0 / self.total as f64
    }
}

/// Receives progress and phase changes from the upload client.
///
/// Implementations are called from whichever task is driving the upload and
/// must not block.
pub trait ProgressSink: Send + Sync {
    /// Called after each chunk is handed to the transport.
    fn on_progress(&self, path: &Path, progress: UploadProgress);

    /// Called whenever an attempt changes phase.
    fn on_phase(&self, _path: &Path, _phase: UploadPhase) {}
}

/// Logs progress at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_progress(&self, path: &Path, progress: UploadProgress) {
        debug!(
            path = %path.display(),
            bytes_sent = progress.bytes_sent,
            total = progress.total,
            percent = format!("{:.1}", progress.percent()),
            "Upload progress"
        );
    }
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _path: &Path, _progress: UploadProgress) {}
}
