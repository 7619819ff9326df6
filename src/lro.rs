//! # Long-Running Operations
//!
//! Waiting on ARM provisioning under a deadline and a cancellation token.
//!
//! Giving up locally never cancels the remote operation; the service keeps
//! provisioning and the next read reconciles whatever state it reached.

use crate::client::{ApiError, EnvironmentsApi, OperationHandle, OperationStatus};
use crate::constants::MIN_LRO_POLL_INTERVAL_SECS;
use crate::observability::metrics;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a bounded future did not finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    TimedOut,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("deadline exceeded")]
    TimedOut,

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<Interrupted> for WaitError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::TimedOut => Self::TimedOut,
            Interrupted::Cancelled => Self::Cancelled,
        }
    }
}

/// Deadlines this far out are treated as unbounded
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deadline `timeout` from now, capped so huge timeouts cannot overflow
#[must_use]
pub fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout.min(FAR_FUTURE)
}

/// Run `fut` until it completes, the deadline passes, or `cancel` fires
///
/// # Errors
///
/// Returns [`Interrupted`] when the deadline or cancellation wins.
pub async fn bounded<F, T>(
    deadline: Instant,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, Interrupted>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Interrupted::Cancelled),
        () = tokio::time::sleep_until(deadline) => Err(Interrupted::TimedOut),
        value = fut => Ok(value),
    }
}

/// Poll `handle` until it reaches a terminal status
///
/// Sleeps `max(Retry-After, poll_interval)` between polls, and never less
/// than one second.
///
/// # Errors
///
/// - [`WaitError::Failed`] when the operation ends `Failed` or `Canceled`
/// - [`WaitError::Api`] when a poll request fails
/// - [`WaitError::TimedOut`] / [`WaitError::Cancelled`] when interrupted
pub async fn wait_for_completion(
    api: &dyn EnvironmentsApi,
    handle: &OperationHandle,
    deadline: Instant,
    cancel: &CancellationToken,
    poll_interval: Duration,
) -> Result<(), WaitError> {
    if *handle == OperationHandle::Completed {
        return Ok(());
    }

    let delay = handle
        .retry_after()
        .unwrap_or_default()
        .max(poll_interval)
        .max(Duration::from_secs(MIN_LRO_POLL_INTERVAL_SECS));

    loop {
        metrics::increment_lro_polls();
        match bounded(deadline, cancel, api.poll(handle)).await?? {
            OperationStatus::Succeeded => return Ok(()),
            OperationStatus::Failed(reason) => return Err(WaitError::Failed(reason)),
            OperationStatus::Canceled => {
                return Err(WaitError::Failed("operation was canceled".to_string()))
            }
            OperationStatus::InProgress => {
                debug!(delay = ?delay, "Operation still in progress");
            }
        }

        bounded(deadline, cancel, tokio::time::sleep(delay)).await?;
    }
}
