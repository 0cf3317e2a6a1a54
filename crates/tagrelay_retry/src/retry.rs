//! The retry loop.

use crate::RetryPolicy;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use tagrelay_error::RetryableError;
use tokio_retry2::{Retry, RetryError};
use tracing::{error, warn};

/// Run `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up.
///
/// The closure receives the 1-based attempt number. Every attempt is fully
/// independent: nothing is carried over from a failed attempt except the
/// counter. Each failure is logged once with its attempt number and cause,
/// and exhaustion is logged as an error before the last cause is returned.
///
/// # Example
///
/// ```rust,ignore
/// let page = retry_with_backoff(&policy, "hashtag search", |attempt| {
///     client.search_once(tag, token.as_deref(), attempt)
/// })
/// .await?;
/// ```
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + Display,
{
    let max_attempts = policy.attempts();
    let attempt = AtomicU32::new(0);

    Retry::spawn(policy.delays(), || {
        let n = attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let fut = f(n);
        async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(e) if !e.is_retryable() => {
                    error!(operation, attempt = n, max_attempts, error = %e, "Permanent failure, not retrying");
                    Err(RetryError::Permanent(e))
                }
                Err(e) if n >= max_attempts => {
                    warn!(operation, attempt = n, max_attempts, error = %e, "Attempt failed");
                    error!(operation, attempts = n, "Retries exhausted");
                    Err(RetryError::Permanent(e))
                }
                Err(e) => {
                    warn!(operation, attempt = n, max_attempts, error = %e, "Attempt failed, will retry");
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
            }
        }
    })
    .await
}
