//! Exponential-backoff retry around fallible API calls.

use std::future::Future;

use mailguard_core::{GuardError, Result};
use tokio_retry::RetryIf;
use tracing::warn;

use crate::config::RetryPolicy;

impl RetryPolicy {
    /// Run `call` until it succeeds, fails permanently, or retries run out
    ///
    /// Only errors for which [`GuardError::is_retryable`] holds are retried;
    /// anything else is returned on the spot.
    pub async fn run<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let should_retry = |err: &GuardError| {
            if !err.is_retryable() {
                return false;
            }
            if attempt < self.max_retries {
                let delay = self.backoff_for(attempt);
                attempt += 1;
                warn!(
                    operation,
                    attempt,
                    max_retries = self.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient failure, retrying"
                );
            }
            true
        };
        RetryIf::spawn(self.delays(), call, should_retry).await
    }
}
