//! Retry with a fixed delay, bounded by a cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TransferError;

/// How often and how patiently to retry one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub retries: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    #[must_use]
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }
}

/// Run `op` until it succeeds or `policy.retries` extra attempts fail.
///
/// Every attempt races `token`: cancellation drops the in-flight attempt and
/// returns [`TransferError::Aborted`] without further retries. The last
/// attempt's error is returned when retries run out.
///
/// # Errors
///
/// Returns the final attempt's error or [`TransferError::Aborted`].
pub async fn with_retries<T, F, Fut>(
    policy: RetryPolicy,
    token: &CancellationToken,
    mut op: F,
) -> Result<T, TransferError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransferError>>,
{
    let attempts = policy.retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            if token.is_cancelled() {
                return Err(TransferError::Aborted);
            }
            if !policy.delay.is_zero() {
                tokio::select! {
                    () = token.cancelled() => return Err(TransferError::Aborted),
                    () = tokio::time::sleep(policy.delay) => {}
                }
            }
        }

        let result = tokio::select! {
            () = token.cancelled() => return Err(TransferError::Aborted),
            result = op() => result,
        };

        attempt += 1;
        match result {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts || err.is_aborted() => return Err(err),
            Err(err) => {
                debug!(attempt, attempts, error = %err, "retrying failed operation");
            }
        }
    }
}
