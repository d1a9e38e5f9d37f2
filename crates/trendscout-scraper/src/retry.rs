//! Linear backoff for whole scrape attempts.
//!
//! Attempt `n` (1-based) that fails with a retryable error is followed by a
//! sleep of `n * base_delay` before attempt `n + 1`. Non-retryable errors are
//! returned immediately. When the budget runs out the last error is wrapped
//! in [`ScrapeError::Exhausted`].

use std::future::Future;
use std::time::Duration;

use crate::error::ScrapeError;

/// Sleep that follows failed attempt `attempt` (1-based).
pub(crate) fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay.saturating_mul(attempt)
}

/// Runs `operation` up to `max_attempts` times. The closure receives the
/// 1-based attempt number.
///
/// `max_attempts` of zero is treated as one.
pub(crate) async fn retry_linear<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => err,
        };

        if attempt >= max_attempts {
            tracing::error!(
                attempts = attempt,
                error = %err,
                "scrape retry budget exhausted"
            );
            return Err(ScrapeError::Exhausted {
                attempts: attempt,
                last: Box::new(err),
            });
        }

        let delay = backoff_delay(base_delay, attempt);
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "scrape attempt failed, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
