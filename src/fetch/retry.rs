//! Retry with exponential backoff and jitter for network attempts.

use crate::spoonacular::FetchError;
use crate::utils::fmt_duration;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts made after the first one fails.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each one after it.
    pub base_delay: Duration,
    /// Upper bound on any single delay, jitter included.
    pub max_delay: Duration,
    /// Fraction of the delay added at random (0.0 = none, 1.0 = up to double).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-indexed).
    ///
    /// `min(base * 2^retry, max) * (1 + random * jitter)`, capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);

        if self.jitter <= 0.0 {
            return capped;
        }
        let spread = rand::random::<f64>() * self.jitter.min(1.0);
        // Float scaling can leave Duration's range for delays near Duration::MAX.
        Duration::try_from_secs_f64(capped.as_secs_f64() * (1.0 + spread))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's retries are exhausted. The last error is returned.
pub async fn retry_async<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut retry = 0;
    loop {
        let attempt = retry + 1;
        match operation(attempt).await {
            Ok(value) => {
                if retry > 0 {
                    debug!(attempt, url = label, "request succeeded after retrying");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                debug!(attempt, url = label, error = %err, "error is not retryable");
                return Err(err);
            }
            Err(err) if retry >= policy.max_retries => {
                warn!(attempt, url = label, error = %err, "retries exhausted");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.backoff(retry);
                warn!(
                    attempt,
                    max_attempts = policy.max_retries + 1,
                    delay = fmt_duration(delay),
                    url = label,
                    error = %err,
                    "request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
        }
    }
}
