//! Bounded, cancellable retry for ledger operations.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use creditgate_core::defaults::{DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// How many times to attempt an operation and how long to wait between
/// failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy; `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRY_ATTEMPTS,
            Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        )
    }
}

/// Why [`RetryExecutor::execute`] gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The cancellation token fired before the operation succeeded.
    #[error("operation cancelled")]
    Cancelled,
    /// Every attempt failed; `last` is the final failure.
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    /// The operation failed with an error that repeating cannot fix.
    #[error("operation failed permanently on attempt {attempts}: {last}")]
    Permanent { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Runs an async operation under a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Attempt `operation` up to `max_attempts` times.
    ///
    /// The delay is only slept between attempts. Cancellation is checked
    /// before every attempt and raced against both the attempt itself and
    /// the delay; once observed, no further attempt is made.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: F,
        operation_name: &str,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_if(operation, operation_name, cancel, |_| true)
            .await
    }

    /// Like [`execute`](Self::execute), but only errors accepted by
    /// `is_retryable` are retried. Any other error ends the loop at once
    /// with [`RetryError::Permanent`].
    pub async fn execute_if<T, E, F, Fut, P>(
        &self,
        mut operation: F,
        operation_name: &str,
        cancel: &CancellationToken,
        is_retryable: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.policy.max_attempts;
        let delay_ms = u64::try_from(self.policy.retry_delay.as_millis()).unwrap_or(u64::MAX);
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                debug!(operation = operation_name, attempt, "retry cancelled");
                return Err(RetryError::Cancelled);
            }
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(operation = operation_name, attempt, "retry cancelled mid-attempt");
                    return Err(RetryError::Cancelled);
                }
                result = operation() => result,
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !is_retryable(&err) => {
                    error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "operation failed with a non-retryable error"
                    );
                    return Err(RetryError::Permanent {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) if attempt >= max_attempts => {
                    error!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %err,
                        "operation failed, giving up"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        delay_ms,
                        error = %err,
                        "operation failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!(operation = operation_name, attempt, "retry cancelled during backoff");
                            return Err(RetryError::Cancelled);
                        }
                        _ = tokio::time::sleep(self.policy.retry_delay) => {}
                    }
                }
            }
        }
    }
}
