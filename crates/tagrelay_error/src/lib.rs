//! Error types for the tagrelay media pipeline.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use tagrelay_error::{RelayResult, UploadError, UploadErrorKind};
//!
//! fn upload() -> RelayResult<()> {
//!     Err(UploadError::new(UploadErrorKind::FileNotFound("clip.mp4".to_string())))?
//! }
//!
//! match upload() {
//!     Ok(()) => println!("uploaded"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod fetch;
mod retryable;
mod storage;
mod upload;

pub use config::{ConfigError, require_env};
pub use error::{RelayError, RelayErrorKind, RelayResult};
pub use fetch::{FetchError, FetchErrorKind, FetchResult};
pub use retryable::RetryableError;
pub use storage::{StorageError, StorageErrorKind};
pub use upload::{UploadError, UploadErrorKind, UploadResult};
