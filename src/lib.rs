//! repofile - manage a single file in an Azure DevOps git repository
//!
//! A declared file (repository, path, branch, content, commit message) is
//! kept in sync with the remote branch through create, read, update, delete
//! and import operations. Every write is a compare-and-swap push against the
//! branch tip; a push that loses a race with another writer is retried
//! against the new tip until it lands or the timeout expires.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface (JSON state files in, JSON out)
//! - [`resource`] - Lifecycle operations, preconditions and the push reconciler
//! - [`engine`] - Generic wait/retry machinery
//! - [`forge`] - Abstraction over the remote Git REST service
//! - [`core`] - Domain types and configuration
//! - [`telemetry`] - Logging setup
//! - [`ui`] - User-facing output
//!
//! # Guarantees
//!
//! 1. A push is only ever issued against the tip observed just before it
//! 2. Create never overwrites an existing file unless asked to
//! 3. A file removed outside of management is reported, not recreated

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod resource;
pub mod telemetry;
pub mod ui;
