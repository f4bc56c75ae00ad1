//! Bounded retry with exponential backoff at the collaborator boundary.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::context::ExecContext;
use crate::sink::PublishError;
use crate::store::StoreError;

/// Backoff exponent cap (2^16 times the base delay).
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Errors that may succeed when the operation is attempted again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for PublishError {
    fn is_retryable(&self) -> bool {
        match self {
            PublishError::Request(_) => true,
            PublishError::Rejected { status, .. } => *status == 429 || *status >= 500,
            PublishError::Url(_)
            | PublishError::Serialization(_)
            | PublishError::Interrupted(_) => false,
        }
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Database(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included. At least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the retry following failed attempt number `retry_count`
    /// (0-based): `base_delay * 2^retry_count`, capped at `max_delay`.
    pub fn delay(&self, retry_count: u32) -> Duration {
        let factor = 2u32.pow(retry_count.min(MAX_BACKOFF_EXPONENT));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non retryable error, or the
    /// attempts are exhausted. An interrupted backoff returns the last error.
    pub async fn retry<T, E, F, Fut>(
        &self,
        ctx: &ExecContext,
        operation: &str,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut retry_count = 0;
        loop {
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if !error.is_retryable() || retry_count + 1 >= self.max_attempts {
                return Err(error);
            }

            let delay = self.delay(retry_count);
            warn!(
                operation,
                attempt = retry_count + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );
            if ctx.sleep(delay).await.is_err() {
                return Err(error);
            }
            retry_count += 1;
        }
    }
}
