//! import command - Adopt an existing file

use std::path::Path;

use anyhow::{Context as _, Result};

use super::{open_resource, state};
use crate::cli::Context;
use crate::core::types::ImportId;
use crate::ui::output;

/// Import `<repository>/<path>[:<branch>]`, optionally saving the state.
pub async fn import(ctx: &Context, raw: &str, out: Option<&Path>) -> Result<()> {
    // Malformed ids fail before any configuration or network access.
    ImportId::parse(raw).with_context(|| format!("invalid import id '{}'", raw))?;

    let resource = open_resource(ctx)?;
    let decl = resource.import(raw).await?;

    if let Some(path) = out {
        state::save(path, &decl)?;
    }
    let branch = decl.branch_or(resource.default_branch());
    output::success(
        format!("imported {}/{} ({})", decl.repository_id, decl.file, branch),
        ctx.verbosity,
    );
    output::json(&decl)?;
    Ok(())
}
