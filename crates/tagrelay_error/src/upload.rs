//! Upload protocol error types.

/// Upload-specific error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum UploadErrorKind {
    /// The file to upload does not exist
    #[display("File not found: {}", _0)]
    FileNotFound(String),
    /// The URL-issuance endpoint did not hand out a signed upload URL
    #[display("Failed to obtain upload URL: {}", _0)]
    UploadUrl(String),
    /// A transmitted unit of the file was rejected or the transport failed
    #[display("Upload transfer failed: {}", _0)]
    Transfer(String),
    /// The post-creation endpoint rejected the finalize call
    #[display("Post creation failed with HTTP {}: {}", status, message)]
    PostCreation {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// Connection failure or timeout outside the byte transfer
    #[display("Network error: {}", _0)]
    Network(String),
    /// Local file could not be read
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
}

impl UploadErrorKind {
    /// Check if this error type should be retried.
    ///
    /// Every phase failure is transient: a retry starts a fresh session.
    /// A missing file never becomes present by retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, UploadErrorKind::FileNotFound(_))
    }
}

/// Upload error with source location tracking.
///
/// # Examples
///
/// ```
/// use tagrelay_error::{UploadError, UploadErrorKind};
///
/// let err = UploadError::new(UploadErrorKind::Transfer("HTTP 500".to_string()));
/// assert!(format!("{}", err).contains("HTTP 500"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upload Error: {} at line {} in {}", kind, line, file)]
pub struct UploadError {
    /// The kind of error that occurred
    pub kind: UploadErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UploadError {
    /// Create a new UploadError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UploadErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;
