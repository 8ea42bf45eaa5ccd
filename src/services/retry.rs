use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::RuntimeError;
use crate::domain::models::RetryConfig;

/// Final result of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, RuntimeError>,
    /// Attempts made, including the last one
    pub attempts: u32,
}

/// Bounded retry with a fixed pause between attempts
///
/// Only errors for which [`RuntimeError::is_transient`] holds are retried;
/// a permanent error ends the loop immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    max_attempts: u32,
    /// Pause between attempts
    backoff: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy; `max_attempts` of zero is treated as one
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.backoff_ms))
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    ///
    /// The closure receives the 1-based attempt number, so callers can
    /// prepare state (such as a fresh thread) before a retry.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RuntimeError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = u64::try_from(self.backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Transient error, retrying"
                    );
                    sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(attempt, error = %err, "Giving up after final attempt");
                    } else {
                        warn!(attempt, error = %err, "Permanent error, not retrying");
                    }
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
