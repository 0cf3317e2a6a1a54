//! Batch upload results.

use crate::UploadSession;
use std::path::{Path, PathBuf};
use tagrelay_error::{UploadError, UploadResult};

/// Result of uploading one file from a batch.
#[derive(Debug)]
pub struct UploadOutcome {
    path: PathBuf,
    result: UploadResult<UploadSession>,
}

impl UploadOutcome {
    /// Pair a file with its upload result.
    pub fn new(path: PathBuf, result: UploadResult<UploadSession>) -> Self {
        Self { path, result }
    }

    /// The file that was submitted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the post was created.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// The finished session on success.
    pub fn session(&self) -> Option<&UploadSession> {
        self.result.as_ref().ok()
    }

    /// The final error on failure.
    pub fn error(&self) -> Option<&UploadError> {
        self.result.as_ref().err()
    }

    /// Consume the outcome, returning the raw result.
    pub fn into_result(self) -> UploadResult<UploadSession> {
        self.result
    }
}

/// Attempted / succeeded / failed counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, derive_more::Display)]
#[display("attempted {}, succeeded {}, failed {}", attempted, succeeded, failed)]
pub struct UploadSummary {
    /// Files submitted.
    pub attempted: usize,
    /// Files whose post was created.
    pub succeeded: usize,
    /// Files that failed for good.
    pub failed: usize,
}

impl From<&[UploadOutcome]> for UploadSummary {
    fn from(outcomes: &[UploadOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        Self {
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}
