//! Retry with exponential backoff for any fallible async operation.
//!
//! Every failure is retried until attempts run out; the last error is then
//! returned unchanged. Delays are deterministic (no jitter):
//! `initial_delay * 2^(attempt - 2)` before attempt `attempt` (1-indexed, > 1).

use std::future::Future;
use std::time::Duration;

/// Forecast policy: 3 attempts, 1s initial delay
pub const FORECAST_RETRY: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(1000));

/// Early warning and maritime policy: 2 attempts, 500ms initial delay
pub const AUXILIARY_RETRY: RetryPolicy = RetryPolicy::new(2, Duration::from_millis(500));

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt (doubles each attempt after)
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        FORECAST_RETRY
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    pub fn from_millis(max_attempts: u32, initial_delay_ms: u64) -> Self {
        Self::new(max_attempts, Duration::from_millis(initial_delay_ms))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Sleep taken after failed attempt `attempt` (1-indexed) before the next one.
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    /// Sum of all backoff sleeps when every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (1..self.attempts())
            .map(|attempt| self.delay_after_attempt(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Run `operation` up to `policy.max_attempts` times.
///
/// # Example
/// ```ignore
/// let body = with_retry(FORECAST_RETRY, "fetch_forecast", || client.fetch_forecast(region)).await?;
/// ```
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, label: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {} of {}", label, attempt, attempts);
                }
                return Ok(value);
            }
            Err(e) if attempt >= attempts => {
                tracing::error!("{} failed after {} attempts: {}", label, attempts, e);
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after_attempt(attempt);
                tracing::warn!(
                    "{} attempt {} of {} failed: {}; retrying in {:?}",
                    label,
                    attempt,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
