//! Retry-with-backoff for tagrelay network operations.
//!
//! Every network phase in the pipeline (hashtag search, signed-URL issuance,
//! byte transfer, post creation) goes through [`retry_with_backoff`] instead
//! of carrying its own loop. The policy decides how many attempts are made and
//! how long to wait between them; the error decides whether another attempt is
//! worthwhile via [`RetryableError`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod policy;
mod retry;

pub use policy::RetryPolicy;
pub use retry::retry_with_backoff;
pub use tagrelay_error::RetryableError;
