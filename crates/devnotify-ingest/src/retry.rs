//! Capped retry for transient adapter failures.
//!
//! Only errors whose [`IngestError::is_transient`] is true are retried;
//! incomplete payloads and validation failures are permanent for a given
//! input and returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempt cap is hit.
pub async fn retry_with_cap<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(attempt, error = %err, "transient ingest failure, retrying");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
