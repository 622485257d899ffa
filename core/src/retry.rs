//! Bounded retry with exponential backoff for outbound suspension points (§5).
//!
//! Every call to an external collaborator (event source, LLM/NER/embedding
//! adapters, deployment adapter, notification publisher) goes through
//! [`with_retry`]. Non-transient errors ([`crate::Error::is_transient`]
//! returns `false`) are returned on the first attempt; nothing is retried
//! that the error taxonomy says shouldn't be.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed retry policy mandated by spec §5: 3 attempts at 1s / 2s / 4s backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.pow(attempt.saturating_sub(1))
    }
}

/// Run `operation`, retrying on transient errors per `policy`.
///
/// # Errors
/// Returns the last error once `max_attempts` is exhausted, or immediately on
/// the first non-transient error.
pub async fn with_retry<T, F, Fut>(label: &str, policy: RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    call = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Errors matching neither "clearly transient" nor "clearly terminal" still
/// need a decision point for callers outside the adapter boundary.
#[must_use]
pub fn should_abort_phase(err: &Error) -> bool {
    !err.is_transient() && !err.is_contract_violation()
}
