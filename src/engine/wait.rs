//! engine::wait
//!
//! Polling state machine for operations that converge on a target state.
//!
//! # Design
//!
//! A [`StateChangeConf`] repeatedly invokes an async refresh function until
//! the observed state is one of the target states (seen the configured number
//! of consecutive times), the refresh fails, or the timeout expires.
//!
//! Each refresh reports one of:
//! - [`Refresh::Observed`]: a state and the value to return if it is a target
//! - [`Refresh::Recovered`]: a pending state reached after a recoverable
//!   failure; the failure is remembered and reported if the wait times out
//! - `Err(e)`: a terminal failure, returned immediately
//!
//! The pause between attempts starts at 100ms and doubles, clamped to
//! `[min_interval, 10s]`. Every refresh is bounded by the time remaining.
//!
//! # Example
//!
//! ```
//! use repofile::engine::{Refresh, StateChangeConf};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let conf = StateChangeConf {
//!     pending: vec!["waiting"],
//!     target: vec!["done"],
//!     timeout: Duration::from_secs(5),
//!     min_interval: Duration::from_millis(1),
//!     delay: Duration::ZERO,
//!     continuous_target_occurrence: 1,
//! };
//!
//! let value = conf
//!     .wait_for_state(|| async { Ok::<_, std::io::Error>(Refresh::Observed { state: "done", result: 42 }) })
//!     .await
//!     .unwrap();
//! assert_eq!(value, 42);
//! # });
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};

/// First pause between attempts, before clamping.
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Upper bound on the pause between attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Outcome of a single refresh.
#[derive(Debug)]
pub enum Refresh<T, S, E> {
    /// The refresh observed `state`. `result` is returned if `state` is a target.
    Observed { state: S, result: T },
    /// The refresh hit a recoverable failure and remains in pending `state`.
    Recovered { state: S, cause: E },
}

/// Errors from waiting on a state change.
#[derive(Debug, thiserror::Error)]
pub enum WaitError<E: std::error::Error + 'static> {
    /// The refresh function failed with a terminal error.
    #[error(transparent)]
    Refresh(E),

    /// The target state was not reached in time.
    #[error(
        "timeout while waiting for state to become '{target}' (last state: '{last_state}', timeout: {timeout:?}){}",
        last_error_suffix(.last_error)
    )]
    Timeout {
        /// Target states, comma separated
        target: String,
        /// Last state observed (`none` if no refresh completed)
        last_state: String,
        /// The configured timeout
        timeout: Duration,
        /// Last recoverable failure, if any
        last_error: Option<E>,
    },

    /// The refresh reported a state that is neither pending nor target.
    #[error("unexpected state '{state}', wanted target '{target}'")]
    UnexpectedState {
        /// The state that was observed
        state: String,
        /// Target states, comma separated
        target: String,
    },
}

impl<E: std::error::Error + 'static> WaitError<E> {
    /// The underlying failure: the terminal error, or the last recoverable
    /// one for a timeout.
    pub fn cause(&self) -> Option<&E> {
        match self {
            WaitError::Refresh(e) => Some(e),
            WaitError::Timeout { last_error, .. } => last_error.as_ref(),
            WaitError::UnexpectedState { .. } => None,
        }
    }

    /// Whether the wait ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

fn last_error_suffix<E: Display>(last_error: &Option<E>) -> String {
    match last_error {
        Some(e) => format!(": {}", e),
        None => String::new(),
    }
}

/// Configuration of a wait for a state change.
#[derive(Debug, Clone)]
pub struct StateChangeConf<S> {
    /// States in which to keep polling
    pub pending: Vec<S>,
    /// States that end the wait successfully
    pub target: Vec<S>,
    /// Maximum total time to wait
    pub timeout: Duration,
    /// Smallest pause between attempts
    pub min_interval: Duration,
    /// Pause before the first attempt
    pub delay: Duration,
    /// Consecutive target observations required
    pub continuous_target_occurrence: u32,
}

impl<S> StateChangeConf<S>
where
    S: Copy + PartialEq + Display,
{
    /// Poll `refresh` until a target state is reached.
    ///
    /// # Errors
    ///
    /// - [`WaitError::Refresh`] if `refresh` returns `Err`
    /// - [`WaitError::UnexpectedState`] for a state outside pending/target,
    ///   or a recovered failure reported in a target state
    /// - [`WaitError::Timeout`] if the timeout expires first
    pub async fn wait_for_state<T, E, F, Fut>(&self, mut refresh: F) -> Result<T, WaitError<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Refresh<T, S, E>, E>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut last_state: Option<S> = None;
        let mut last_error: Option<E> = None;
        let mut occurrences: u32 = 0;
        let mut attempt: u32 = 0;

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timeout_error(last_state, last_error));
            }

            let outcome = match timeout(remaining, refresh()).await {
                Ok(outcome) => outcome.map_err(WaitError::Refresh)?,
                Err(_) => return Err(self.timeout_error(last_state, last_error)),
            };

            match outcome {
                Refresh::Observed { state, result } => {
                    last_state = Some(state);
                    if self.target.contains(&state) {
                        occurrences += 1;
                        if occurrences >= self.continuous_target_occurrence.max(1) {
                            return Ok(result);
                        }
                    } else if self.pending.contains(&state) {
                        occurrences = 0;
                    } else {
                        return Err(self.unexpected(state));
                    }
                }
                Refresh::Recovered { state, cause } => {
                    last_state = Some(state);
                    if !self.pending.contains(&state) {
                        return Err(self.unexpected(state));
                    }
                    occurrences = 0;
                    last_error = Some(cause);
                }
            }

            let pause = self.backoff(attempt);
            attempt = attempt.saturating_add(1);
            if Instant::now() + pause >= deadline {
                return Err(self.timeout_error(last_state, last_error));
            }
            sleep(pause).await;
        }
    }

    /// Pause before attempt `attempt + 1`.
    fn backoff(&self, attempt: u32) -> Duration {
        let doubled = INITIAL_BACKOFF.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        doubled.clamp(self.min_interval.min(MAX_BACKOFF), MAX_BACKOFF)
    }

    fn targets(&self) -> String {
        join(&self.target)
    }

    fn unexpected<E: std::error::Error + 'static>(&self, state: S) -> WaitError<E> {
        WaitError::UnexpectedState {
            state: state.to_string(),
            target: self.targets(),
        }
    }

    fn timeout_error<E: std::error::Error + 'static>(
        &self,
        last_state: Option<S>,
        last_error: Option<E>,
    ) -> WaitError<E> {
        WaitError::Timeout {
            target: self.targets(),
            last_state: last_state.map_or_else(|| "none".to_string(), |s| s.to_string()),
            timeout: self.timeout,
            last_error,
        }
    }
}

fn join<S: Display>(states: &[S]) -> String {
    states
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
