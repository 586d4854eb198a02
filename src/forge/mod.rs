//! forge
//!
//! Abstraction for the remote repository service.
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface for interacting with the service
//! hosting the repositories. Commands use the [`create_forge`] factory
//! function rather than constructing a specific implementation.
//!
//! - Forge failures are never swallowed: callers either handle a specific
//!   recoverable case (not-found, stale push) or propagate the error
//! - Pushes are compare-and-swap on the branch tip; there is no client-side
//!   locking
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`azure`]: Azure DevOps implementation using the Git REST API
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Forge selection and creation
//!
//! # Example
//!
//! ```ignore
//! use repofile::forge::{create_forge, Forge};
//!
//! let forge = create_forge(config.provider(), &token)?;
//! let tip = forge.get_branch("config-repo", "main").await?;
//! println!("main is at {}", tip.commit_id);
//! ```

pub mod azure;
mod factory;
pub mod mock;
mod traits;

pub use factory::{
    create_forge, detect_provider, is_hosted_service, valid_forge_names, ForgeProvider,
};
pub use traits::*;
