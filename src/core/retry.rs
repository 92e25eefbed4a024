//! Retry/backoff combinator for upstream calls.

use crate::utils::error::{BacklinkError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

/// Bounded exponential backoff: `base_delay`, then doubling, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delays slept between attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        // From a base of 2, ExponentialBackoff yields `base_ms * 2^(n+1)`; halving
        // gives `base_ms * 2^n` exactly, with the cap doubled to match.
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor(base_ms)
            .max_delay(self.max_delay.saturating_mul(2))
            .map(|delay| delay / 2)
            .take(self.max_attempts.saturating_sub(1))
    }
}

/// Runs `operation` under `policy`, retrying only errors that report
/// [`BacklinkError::is_retryable`]. The last error is returned once attempts run out.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0usize;
    RetryIf::start(
        policy.delays(),
        || {
            attempt += 1;
            if attempt > 1 {
                tracing::info!("Retrying {} (attempt {}/{})", label, attempt, policy.max_attempts);
            }
            operation()
        },
        |err: &BacklinkError| {
            let retry = err.is_retryable();
            if retry {
                tracing::warn!("{} failed with a transient error: {}", label, err);
            }
            retry
        },
    )
    .await
}
