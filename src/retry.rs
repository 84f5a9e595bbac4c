//! Staged retry for upstream fetches.
//!
//! The source is flaky in bursts: a request that fails now often works a
//! second later, and one that doesn't usually works after a longer pause.
//! The schedule therefore runs three quick attempts, then one after a
//! medium delay, then a final one after a long delay — five attempts in
//! total. Callers treat an exhausted schedule as "no data for this date",
//! not as a fatal error.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::Result;

/// Delay schedule for one retried operation.
///
/// The delays slept before attempts 2–5 are `[short, short, medium, long]`;
/// there is no extra pause between the third attempt and the medium stage.
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
    short: Duration,
    medium: Duration,
    long: Duration,
}

impl RetrySchedule {
    /// Create a schedule from explicit stage delays.
    #[must_use]
    pub fn new(short: Duration, medium: Duration, long: Duration) -> Self {
        Self {
            short,
            medium,
            long,
        }
    }

    /// Build the schedule from configuration.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.short_ms),
            Duration::from_millis(config.medium_ms),
            Duration::from_millis(config.long_ms),
        )
    }

    /// The delays slept before attempts 2 through 5, in order.
    #[must_use]
    pub fn delays(&self) -> [Duration; 4] {
        [self.short, self.short, self.medium, self.long]
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Run `operation` up to five times according to `schedule`.
///
/// Returns the first success, or the error from the final attempt once
/// the schedule is exhausted.
///
/// # Errors
///
/// Propagates the last attempt's error after all five attempts fail.
pub async fn with_retry<T, F, Fut>(schedule: RetrySchedule, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = match operation().await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for (failed_attempts, delay) in schedule.delays().into_iter().enumerate() {
        tracing::debug!(
            "attempt {}/5 failed ({last_err}), retrying in {}ms",
            failed_attempts + 1,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => last_err = e,
        }
    }

    tracing::warn!("all 5 attempts failed: {last_err}");
    Err(last_err)
}
