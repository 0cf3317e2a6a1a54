//! Retry policy configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};

/// How many times to attempt an operation and how long to wait in between.
///
/// Delays grow exponentially from `initial_backoff_ms`, doubling per attempt,
/// capped at `max_backoff_ms`.
///
/// # Examples
///
/// ```
/// use tagrelay_retry::RetryPolicy;
///
/// let policy = RetryPolicy::new(3).with_backoff(500, 4_000);
/// assert_eq!(*policy.max_attempts(), 3);
/// assert_eq!(policy.delays().count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    initial_backoff_ms: u64,

    /// Upper bound for any single delay, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,

    /// Randomize each delay to spread out concurrent retries.
    #[serde(default = "default_jitter")]
    jitter: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` attempts and default backoff.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Set the initial and maximum backoff.
    pub fn with_backoff(mut self, initial_ms: u64, max_ms: u64) -> Self {
        self.initial_backoff_ms = initial_ms;
        self.max_backoff_ms = max_ms.max(initial_ms);
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Override the attempt count, keeping the backoff settings.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Attempt count with the zero case folded into one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// The sleeps taken between attempts; one fewer than [`Self::attempts`].
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        // ExponentialBackoff yields factor * base^n, so base 2 with half the
        // initial delay as factor doubles from `initial_backoff_ms`.
        let factor = self.initial_backoff_ms.div_ceil(2);
        let spread: fn(Duration) -> Duration = if self.jitter { jitter } else { |d| d };
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(Duration::from_millis(self.max_backoff_ms))
            .map(spread)
            .take(self.attempts() as usize - 1)
    }
}
