//! Exponential backoff retry policy.
//!
//! Retries an async operation while its error is accepted by the policy's
//! predicate (retryable errors by default). The delay before retry `n`
//! (0-based) is `base_delay * 2^n`, capped at `max_delay`.
//!
//! The policy does not deduplicate side effects: retrying a placement after a
//! transient error may submit the order twice if the exchange had already
//! accepted it.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ExecError, ExecResult};

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for a single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Retry configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
    /// Total attempts allowed; `None` retries until success or a fatal error
    max_attempts: Option<u32>,
    retry_if: fn(&ExecError) -> bool,
}

impl RetryPolicy {
    /// Policy with explicit delays, retrying forever on retryable errors.
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
            max_attempts: None,
            retry_if: ExecError::is_retryable,
        }
    }

    /// Stop after `attempts` total attempts (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Retry only errors accepted by `predicate`.
    pub fn with_predicate(mut self, predicate: fn(&ExecError) -> bool) -> Self {
        self.retry_if = predicate;
        self
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Delay slept before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or exhausts `max_attempts`.
    ///
    /// When attempts run out the last retryable error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> ExecResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ExecResult<T>>,
    {
        let mut retries: u32 = 0;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if retries > 0 {
                        debug!(operation = operation_name, retries, "Succeeded after retries");
                    }
                    return Ok(value);
                },
                Err(error) => error,
            };

            if !(self.retry_if)(&error) {
                return Err(error);
            }

            let attempts = retries.saturating_add(1);
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(operation = operation_name, attempts, %error, "Giving up after retries");
                return Err(error);
            }

            let delay = self.delay_for(retries);
            warn!(
                operation = operation_name,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                %error,
                "Retryable failure, backing off"
            );
            tokio::time::sleep(delay).await;
            retries = attempts;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

// =============================================================================
// Tests
// =============================================================================
