//! Retry with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each retry after that
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

// == Retry With Backoff ==
/// Runs `operation` until it succeeds or `policy` is exhausted.
///
/// The caller is suspended during backoff; the last error is returned once
/// every attempt has failed.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retry = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if retry > 0 {
                    debug!("Operation succeeded after {} retries", retry);
                }
                return Ok(value);
            }
            Err(e) if retry >= policy.max_retries => {
                warn!(
                    "Operation failed after {} attempts, giving up: {}",
                    retry + 1,
                    e
                );
                return Err(e);
            }
            Err(e) => {
                retry += 1;
                let delay = policy.delay_for(retry);
                warn!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    retry,
                    policy.total_attempts(),
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
