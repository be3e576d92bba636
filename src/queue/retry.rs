//! # Queue Retry Policy
//!
//! Fixed-delay, bounded-attempt retry for queue writes. A write that keeps failing
//! is escalated as [`QueueError::RetriesExhausted`] instead of being dropped.

use super::errors::{QueueError, QueueResult};
use crate::config::QueueConfig;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::constants::retry::MAX_ATTEMPTS,
            delay: Duration::from_millis(crate::constants::retry::DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// Non-transient errors are returned immediately. Transient errors are logged
    /// and retried after `delay`; when the last attempt fails the error is wrapped
    /// in [`QueueError::RetriesExhausted`] carrying the attempt count.
    pub async fn run<T, F, Fut>(
        &self,
        queue: &str,
        operation: &str,
        mut attempt_fn: F,
    ) -> QueueResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = QueueResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    warn!(
                        queue = %queue,
                        operation = %operation,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %err,
                        "Queue operation failed, retrying (attempt {} of {})",
                        attempt,
                        max_attempts
                    );
                    last_error = Some(err);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        Err(QueueError::RetriesExhausted {
            queue: queue.to_string(),
            operation: operation.to_string(),
            attempts: max_attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}
