//! Signed-URL upload client.
//!
//! Uploading a file is a three-phase exchange with the destination service:
//!
//! 1. ask for a signed upload URL and an opaque content hash,
//! 2. PUT the file's bytes to that URL,
//! 3. create a post that references the hash.
//!
//! [`UploadClient::upload_single`] runs the three phases as one attempt and
//! retries whole attempts with backoff. Nothing is carried from one attempt
//! to the next: the URL and hash belong to a single server-side session.
//! [`UploadClient::upload_batch`] uploads several files concurrently and
//! returns results in submission order.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod outcome;
mod progress;
mod session;
mod transfer;

pub use client::UploadClient;
pub use config::{TransferMode, UploadConfig, UploadCredentials};
pub use outcome::{UploadOutcome, UploadSummary};
pub use progress::{NoProgress, ProgressSink, TracingProgress, UploadProgress};
pub use session::{UploadPhase, UploadSession, UploadTicket};
pub use tagrelay_error::{UploadError, UploadErrorKind, UploadResult};
