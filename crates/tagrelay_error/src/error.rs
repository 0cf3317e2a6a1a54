//! Top-level error wrapper types.

use crate::{ConfigError, FetchError, StorageError, UploadError};

/// The union of every error the pipeline can surface.
///
/// # Examples
///
/// ```
/// use tagrelay_error::{RelayError, ConfigError};
///
/// let err: RelayError = ConfigError::new("RAPID_API_KEY environment variable not set").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum RelayErrorKind {
    /// Configuration or credential error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Ledger or media file storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Hashtag search or media download error
    #[from(FetchError)]
    Fetch(FetchError),
    /// Upload protocol error
    #[from(UploadError)]
    Upload(UploadError),
}

/// Tagrelay error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Tagrelay Error: {}", _0)]
pub struct RelayError(Box<RelayErrorKind>);

impl RelayError {
    /// Create a new error from a kind.
    pub fn new(kind: RelayErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RelayErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to RelayErrorKind
impl<T> From<T> for RelayError
where
    T: Into<RelayErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for tagrelay operations.
pub type RelayResult<T> = std::result::Result<T, RelayError>;
