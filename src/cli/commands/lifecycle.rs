//! create / read / update / delete commands

use std::fmt;
use std::path::Path;

use anyhow::{bail, Result};

use super::{load_config, open_resource, resource_from, state};
use crate::cli::Context;
use crate::resource::{FileDeclaration, RepositoryFileResource, ResourceError};
use crate::ui::output;

/// Lifecycle operation run against a state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Run `op` against the declaration stored at `path`.
///
/// The state file is rewritten after success. A read that finds the file
/// removed out of band also succeeds, with the id cleared.
pub async fn lifecycle(ctx: &Context, op: Operation, path: &Path) -> Result<()> {
    let mut decl = state::load(path)?;
    let resource = open_resource(ctx)?;

    match apply(&resource, op, &mut decl).await {
        Ok(()) => {}
        Err(err) if op == Operation::Read && err.is_gone() => {
            output::warn(
                format!("{} no longer exists; id cleared", describe(&decl)),
                ctx.verbosity,
            );
        }
        Err(err) => return Err(err.into()),
    }

    state::save(path, &decl)?;
    output::success(format!("{}: {}", op, describe(&decl)), ctx.verbosity);
    output::json(&decl)?;
    Ok(())
}

/// Update the file at `path` to the content and comment declared in `desired`.
///
/// Fails before any remote call when `desired` moves the file to another
/// repository, path or branch; that change needs a delete and a create.
pub async fn update(ctx: &Context, path: &Path, desired: &Path) -> Result<()> {
    let mut decl = state::load(path)?;
    let target = state::load(desired)?;
    let config = load_config(ctx)?;

    if decl.requires_replacement(&target, &config.default_branch()) {
        bail!(
            "{} cannot be updated in place to {}; delete and create it instead",
            describe(&decl),
            describe(&target)
        );
    }
    decl.content = target.content;
    decl.comment = target.comment;

    let resource = resource_from(&config)?;
    resource.update(&mut decl).await?;

    state::save(path, &decl)?;
    output::success(
        format!("{}: {}", Operation::Update, describe(&decl)),
        ctx.verbosity,
    );
    output::json(&decl)?;
    Ok(())
}

async fn apply(
    resource: &RepositoryFileResource,
    op: Operation,
    decl: &mut FileDeclaration,
) -> Result<(), ResourceError> {
    match op {
        Operation::Create => resource.create(decl).await,
        Operation::Read => resource.read(decl).await,
        Operation::Update => resource.update(decl).await,
        Operation::Delete => resource.delete(decl).await,
    }
}

fn describe(decl: &FileDeclaration) -> String {
    match &decl.branch {
        Some(branch) => format!("{}/{} ({})", decl.repository_id, decl.file, branch),
        None => format!("{}/{} (default branch)", decl.repository_id, decl.file),
    }
}
