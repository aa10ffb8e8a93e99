//! Retry logic.
//!
//! # Responsibilities
//! - Execute a fallible async operation up to `max_attempts` times
//! - Sleep with exponential backoff + jitter between attempts
//! - Return the last error once attempts are exhausted
//!
//! # Design Decisions
//! - The caller checks the circuit breaker first; retries never bypass it
//! - Callers decide which errors are transient via `execute_if`

use std::future::Future;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryExecutor {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Retry on every error.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.execute_if(operation, |_| true).await
    }

    /// Retry only while `should_retry` accepts the error.
    pub async fn execute_if<T, E, F, Fut, P>(&self, mut operation: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && should_retry(&e) => {
                    let delay = calculate_backoff(attempt, self.initial_backoff_ms, self.max_backoff_ms);
                    tracing::info!(attempt, delay = ?delay, error = %e, "Retrying operation");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt > 1 {
                        tracing::warn!(attempts = attempt, error = %e, "Giving up after retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}
