//! engine::retry
//!
//! Bounded retry of a fallible async operation.
//!
//! Built on [`StateChangeConf`]: the operation is attempted until it
//! succeeds, fails with a [`RetryError::NonRetryable`] error, or the timeout
//! expires. A timeout reports the last retryable error.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use super::wait::{Refresh, StateChangeConf, WaitError};

/// Smallest pause between retry attempts.
pub const RETRY_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Classification of a failed attempt.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Try again (until the timeout expires)
    Retryable(E),
    /// Stop and return the error
    NonRetryable(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryState {
    Retrying,
    Success,
}

impl fmt::Display for RetryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryState::Retrying => write!(f, "retryableerror"),
            RetryState::Success => write!(f, "success"),
        }
    }
}

/// Run `operation` until it succeeds, fails terminally, or `timeout` expires.
///
/// # Errors
///
/// - [`WaitError::Refresh`] with the first non-retryable error
/// - [`WaitError::Timeout`] carrying the last retryable error
pub async fn retry<T, E, F, Fut>(timeout: Duration, mut operation: F) -> Result<T, WaitError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
{
    let conf = StateChangeConf {
        pending: vec![RetryState::Retrying],
        target: vec![RetryState::Success],
        timeout,
        min_interval: RETRY_MIN_INTERVAL.min(timeout),
        delay: Duration::ZERO,
        continuous_target_occurrence: 1,
    };

    conf.wait_for_state(|| {
        let attempt = operation();
        async move {
            match attempt.await {
                Ok(result) => Ok(Refresh::Observed {
                    state: RetryState::Success,
                    result,
                }),
                Err(RetryError::Retryable(cause)) => Ok(Refresh::Recovered {
                    state: RetryState::Retrying,
                    cause,
                }),
                Err(RetryError::NonRetryable(e)) => Err(e),
            }
        }
    })
    .await
}
