//! Stage execution plumbing: timeouts, one local retry, cancellation.
//!
//! Every call into the retriever or a model-backed agent is a potentially
//! long-latency external call. Each gets a timeout; a timeout or malformed
//! model output is a transient failure retried once locally. Anything
//! still failing after the retry propagates, and the workflow converts it
//! into a typed terminal result.

use docchat_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run one workflow stage with a timeout and a single transient retry.
///
/// `operation` must be retry-safe: it is invoked at most twice.
pub async fn run_stage<T, F, Fut>(
    stage_name: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    operation: F,
) -> AppResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    match attempt(stage_name, timeout, cancel, &operation).await {
        Ok(value) => Ok(value),
        Err(err) if err.is_transient() => {
            tracing::warn!("Stage '{}' failed transiently ({}), retrying once", stage_name, err);
            attempt(stage_name, timeout, cancel, &operation).await
        }
        Err(err) => Err(err),
    }
}

async fn attempt<T, F, Fut>(
    stage_name: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    operation: &F,
) -> AppResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = tokio::time::timeout(timeout, operation()) => match result {
            Ok(inner) => inner,
            Err(_) => Err(AppError::StageTimeout(
                stage_name.to_string(),
                timeout.as_secs(),
            )),
        },
    }
}
