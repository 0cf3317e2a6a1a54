//! Retry classification shared by every error that crosses a network boundary.

use crate::{FetchError, UploadError};

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use tagrelay_error::{FetchError, FetchErrorKind, RetryableError};
///
/// let err = FetchError::new(FetchErrorKind::Upstream {
///     status: 503,
///     message: "Service unavailable".to_string(),
/// });
/// assert!(err.is_retryable());
///
/// let err = FetchError::new(FetchErrorKind::Parse("not json".to_string()));
/// assert!(!err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger another attempt.
    ///
    /// Transient errors like 503, 429, or network timeouts return true.
    /// Permanent errors like a missing local file return false.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for FetchError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl RetryableError for UploadError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
