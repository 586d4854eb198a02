//! cli
//!
//! Command-line interface layer for repofile.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Move declarations between JSON state files and the resource layer
//! - Does NOT talk to the remote service directly
//!
//! # Architecture
//!
//! The CLI stands in for a declarative engine: each subcommand is one
//! lifecycle call on [`crate::resource::RepositoryFileResource`] with the
//! state persisted in between.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::Result;

use crate::ui::output::Verbosity;

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Output verbosity
    pub verbosity: Verbosity,
}

impl Context {
    /// Build the context from parsed flags.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::from_cli(&cli);
    commands::dispatch(cli.command, &ctx).await
}
