//! Hashtag search and media download error types.

/// Fetch-specific error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum FetchErrorKind {
    /// Connection failure or timeout
    #[display("Network error: {}", _0)]
    Network(String),
    /// The search or download endpoint answered with a non-success status
    #[display("Upstream returned HTTP {}: {}", status, message)]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// Response body could not be decoded into the expected schema
    #[display("Failed to parse response: {}", _0)]
    Parse(String),
    /// Downloaded bytes could not be persisted
    #[display("Failed to persist media: {}", _0)]
    Storage(String),
}

impl FetchErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchErrorKind::Network(_) => true,
            FetchErrorKind::Upstream { status, .. } => {
                matches!(*status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            FetchErrorKind::Parse(_) | FetchErrorKind::Storage(_) => false,
        }
    }
}

/// Fetch error with source location tracking.
///
/// # Examples
///
/// ```
/// use tagrelay_error::{FetchError, FetchErrorKind};
///
/// let err = FetchError::new(FetchErrorKind::Upstream {
///     status: 503,
///     message: "busy".to_string(),
/// });
/// assert!(format!("{}", err).contains("503"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Fetch Error: {} at line {} in {}", kind, line, file)]
pub struct FetchError {
    /// The kind of error that occurred
    pub kind: FetchErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl FetchError {
    /// Create a new FetchError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: FetchErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
