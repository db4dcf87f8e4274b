//! Bounded retries with exponential backoff for outbound calls.
//!
//! Every attempt runs under its own timeout. A timed-out attempt counts as a
//! transient upstream failure. Only transient failures are retried; auth and
//! other upstream errors return on the first attempt.

use crate::config::RetryConfig;
use crate::error::{ConcertError, Result};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig, timeout: Duration) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            timeout,
        }
    }

    /// Single attempt, no backoff
    pub fn once(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            timeout,
        }
    }
}

/// Runs `operation` until it succeeds, fails non-transiently, or the
/// attempt budget is spent. The last error is returned in the latter case.
pub async fn with_retry<F, Fut, T>(
    service: &'static str,
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        attempt += 1;

        let outcome = match tokio::time::timeout(policy.timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(ConcertError::transient(
                service,
                format!("{} timed out after {:?}", operation_name, policy.timeout),
            )),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = backoff.min(policy.max_backoff);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );
                tokio::time::sleep(delay).await;
                backoff = (backoff * 2).min(policy.max_backoff);
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Retry budget exhausted"
                    );
                }
                return Err(err);
            }
        }
    }
}
