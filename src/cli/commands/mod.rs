//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each lifecycle handler:
//! 1. Loads the JSON state file
//! 2. Builds a [`RepositoryFileResource`] from the loaded configuration
//! 3. Runs the operation and writes the resulting state back
//!
//! The state is also printed to stdout as JSON; progress goes to stderr.

mod completion;
mod import;
mod lifecycle;
mod state;

pub use completion::completion;
pub use import::import;
pub use lifecycle::{lifecycle, update, Operation};

use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::core::config::Config;
use crate::forge::create_forge;
use crate::resource::RepositoryFileResource;
use crate::ui::output;

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Create { state } => lifecycle(ctx, Operation::Create, &state).await,
        Command::Read { state } => lifecycle(ctx, Operation::Read, &state).await,
        Command::Update {
            state,
            desired: Some(desired),
        } => update(ctx, &state, &desired).await,
        Command::Update { state, .. } => lifecycle(ctx, Operation::Update, &state).await,
        Command::Delete { state } => lifecycle(ctx, Operation::Delete, &state).await,
        Command::Import { id, state } => import(ctx, &id, state.as_deref()).await,
        Command::Completion { shell } => completion(shell),
    }
}

/// Load configuration, reporting its warnings.
fn load_config(ctx: &Context) -> Result<Config> {
    let loaded = Config::load(ctx.config.as_deref()).context("failed to load configuration")?;
    for warning in &loaded.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            ctx.verbosity,
        );
    }
    Ok(loaded.config)
}

/// Build the resource handle from configuration and the access token.
fn open_resource(ctx: &Context) -> Result<RepositoryFileResource> {
    resource_from(&load_config(ctx)?)
}

fn resource_from(config: &Config) -> Result<RepositoryFileResource> {
    let token = config.token()?;
    let forge = create_forge(config.provider(), &token).context("failed to connect to forge")?;

    Ok(RepositoryFileResource::new(Arc::from(forge))
        .with_timeouts(config.timeouts())
        .with_default_branch(config.default_branch()))
}
