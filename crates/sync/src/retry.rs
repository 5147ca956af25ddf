//! Single-retry policy for background persistence.
//!
//! A per-record endpoint without a queue must never be retried
//! indefinitely: a late retry could overwrite a newer write. A failed
//! request is therefore retried exactly once after a short backoff and
//! then dropped; the next full load repairs the drift.

use std::future::Future;
use std::time::Duration;

use curio_core::store::StoreError;
use tokio_util::sync::CancellationToken;

/// Tunable parameters for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the single retry.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(500),
        }
    }
}

/// How a retried request ended.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Done(T),
    /// Failed twice, or failed with an error retrying cannot fix.
    Failed(StoreError),
    /// The token fired first. The request may or may not have reached the
    /// remote; nothing is rolled back either way.
    Cancelled,
}

/// Run `request`, retrying once on a transient failure.
///
/// `request` is called again for the retry, so it must build a fresh
/// future each time.
pub async fn send_with_retry<T, F, Fut>(
    operation: &'static str,
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut request: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let first = tokio::select! {
        biased;
        _ = cancel.cancelled() => return RetryOutcome::Cancelled,
        result = request() => result,
    };

    let error = match first {
        Ok(value) => return RetryOutcome::Done(value),
        Err(e) => e,
    };
    if !error.is_transient() {
        tracing::warn!(operation, error = %error, "Sync request failed, not retrying");
        return RetryOutcome::Failed(error);
    }

    tracing::warn!(
        operation,
        error = %error,
        backoff_ms = config.backoff.as_millis() as u64,
        "Sync request failed, retrying once",
    );

    // Wait before the retry, respecting cancellation.
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return RetryOutcome::Cancelled,
        _ = tokio::time::sleep(config.backoff) => {}
    }

    let second = tokio::select! {
        biased;
        _ = cancel.cancelled() => return RetryOutcome::Cancelled,
        result = request() => result,
    };

    match second {
        Ok(value) => RetryOutcome::Done(value),
        Err(e) => {
            tracing::error!(operation, error = %e, "Sync request dropped after retry");
            RetryOutcome::Failed(e)
        }
    }
}
