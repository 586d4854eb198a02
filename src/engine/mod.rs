//! engine
//!
//! Generic machinery for operations that converge on a remote state.
//!
//! # Architecture
//!
//! - [`wait`]: [`StateChangeConf`], a polling state machine with backoff and
//!   an overall timeout
//! - [`retry`](mod@retry): bounded retry of a fallible operation, built on
//!   [`StateChangeConf`]
//!
//! Neither module knows about repositories or files. The resource layer
//! supplies the refresh functions and classifies its own errors as
//! recoverable or terminal.
//!
//! # Invariants
//!
//! - A terminal error ends the wait immediately and is returned unchanged
//! - Recoverable failures are never returned directly; the last one is
//!   carried by the timeout error
//! - No refresh runs past the overall deadline

pub mod retry;
pub mod wait;

pub use retry::{retry, RetryError, RETRY_MIN_INTERVAL};
pub use wait::{Refresh, StateChangeConf, WaitError};
