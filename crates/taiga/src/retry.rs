//! Retry with exponential backoff for Taiga requests.
//!
//! Retries transient failures (HTTP 429, 5xx, transport errors). Anything
//! else is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use sprintloop_config::RetryConfig;
use tracing::warn;

use crate::error::TaigaError;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first (default 2).
    pub max_attempts: u32,
    /// Base delay in milliseconds (default 250).
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (default 2000).
    pub max_delay_ms: u64,
    /// Backoff multiplier (default 2.0).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 250,
            max_delay_ms: 2000,
            backoff_multiplier: 2.0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            ..Self::default()
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculate the delay after a failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let clamped = delay_ms.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(clamped)
    }
}

// ---------------------------------------------------------------------------
// Retry executor
// ---------------------------------------------------------------------------

/// Execute a Taiga request with retry logic.
///
/// A retryable failure on the last attempt surfaces as
/// [`TaigaError::RetriesExhausted`] wrapping the final error.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, TaigaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TaigaError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                attempt += 1;
                if attempt >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        "max retries exceeded"
                    );
                    return Err(TaigaError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }

                let delay = policy.delay_for_attempt(attempt - 1);
                warn!(
                    operation = operation_name,
                    attempt,
                    max = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    err = %err,
                    "retrying after error"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
