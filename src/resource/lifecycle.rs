//! resource::lifecycle
//!
//! Create, read, update, delete and import of a repository file.
//!
//! Every operation takes the declaration it works on and leaves it holding
//! the state the declarative engine should persist: `id` is set by create and
//! import and cleared when the file is deleted or found missing. Create and
//! import also pin `branch`, so a later change of the default branch never
//! moves a managed file.

use tracing::{info, warn};

use super::precondition::{file_exists, require_branch};
use super::push::normalize_comment;
use super::read::read_file;
use super::reconcile::push_until_synched;
use super::{FileDeclaration, RepositoryFileResource, ResourceError};
use crate::core::types::{ImportId, ResourceId};
use crate::forge::ChangeKind;

impl RepositoryFileResource {
    /// Create the declared file, then read it back.
    ///
    /// Pushes an `Add`, or an `Edit` when the file already exists on the
    /// branch and `overwrite_on_create` is set.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::InvalidId`] if the declaration has no valid identity
    /// - [`ResourceError::BranchNotFound`] if the branch is missing
    /// - [`ResourceError::RefuseOverwrite`] if the file exists and overwriting
    ///   is disabled; nothing is pushed
    /// - [`ResourceError::Push`] / [`ResourceError::Read`] from the push or the
    ///   read-back
    pub async fn create(&self, decl: &mut FileDeclaration) -> Result<(), ResourceError> {
        let id = decl.identity().map_err(ResourceError::InvalidId)?;
        let branch = self.branch_of(decl);
        let forge = self.forge();

        require_branch(forge, &decl.repository_id, &branch).await?;

        let kind = if file_exists(forge, &decl.repository_id, &decl.file, &branch).await? {
            if !decl.overwrite_on_create {
                return Err(ResourceError::RefuseOverwrite {
                    path: decl.file.clone(),
                });
            }
            ChangeKind::Edit
        } else {
            ChangeKind::Add
        };

        let push = push_until_synched(
            forge,
            decl,
            &branch,
            kind,
            Some(decl.content.as_str()),
            &self.timeouts,
        )
        .await?;
        info!(id = %id, %branch, %kind, push_id = push.push_id, "created file");

        decl.id = Some(id);
        decl.branch = Some(branch);
        self.read(decl).await
    }

    /// Refresh the declaration from the remote file.
    ///
    /// Sets `content` and `comment` to what the branch currently holds.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::MissingId`] if the declaration has no id
    /// - [`ResourceError::BranchNotFound`] if the branch is missing
    /// - [`ResourceError::Read`]; when the file is gone the id is cleared and
    ///   [`ResourceError::is_gone`] is true
    pub async fn read(&self, decl: &mut FileDeclaration) -> Result<(), ResourceError> {
        let id = decl.id.clone().ok_or(ResourceError::MissingId)?;
        let branch = self.branch_of(decl);
        let forge = self.forge();

        require_branch(forge, id.repository(), &branch).await?;

        let result = read_file(
            forge,
            id.repository(),
            id.path(),
            &branch,
            self.timeouts.read,
        )
        .await;

        match result {
            Ok(state) => {
                decl.repository_id = id.repository().to_string();
                decl.file = id.path().to_string();
                decl.content = state.content;
                decl.comment = state.comment;
                Ok(())
            }
            Err(source) => {
                let err = ResourceError::Read {
                    repository: id.repository().to_string(),
                    path: id.path().to_string(),
                    source,
                };
                if err.is_gone() {
                    warn!(id = %id, %branch, "file removed outside of management");
                    decl.id = None;
                }
                Err(err)
            }
        }
    }

    /// Push the declared content as an edit, then read it back.
    ///
    /// A comment left over from a previous push's generated default (such as
    /// `Add <path>`) is replaced with `Update <path>`.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::MissingId`] if the declaration has no id
    /// - [`ResourceError::IdentityChanged`] if `repository_id` or `file` no
    ///   longer match the id; nothing is pushed
    /// - otherwise as for [`create`](Self::create), without the overwrite check
    pub async fn update(&self, decl: &mut FileDeclaration) -> Result<(), ResourceError> {
        let id = managed_id(decl)?;
        let branch = self.branch_of(decl);
        let forge = self.forge();

        require_branch(forge, id.repository(), &branch).await?;

        let mut pending = decl.clone();
        pending.comment = normalize_comment(decl.comment.as_deref(), ChangeKind::Edit, &decl.file);

        let push = push_until_synched(
            forge,
            &pending,
            &branch,
            ChangeKind::Edit,
            Some(pending.content.as_str()),
            &self.timeouts,
        )
        .await?;
        info!(id = %id, %branch, push_id = push.push_id, "updated file");

        self.read(decl).await
    }

    /// Delete the file from its branch and clear the id.
    ///
    /// A file that is already absent is not an error: nothing is pushed.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::MissingId`] if the declaration has no id
    /// - [`ResourceError::IdentityChanged`] if `repository_id` or `file` no
    ///   longer match the id; nothing is pushed
    /// - [`ResourceError::Forge`] if the existence probe fails
    /// - [`ResourceError::Push`] if the delete never lands
    pub async fn delete(&self, decl: &mut FileDeclaration) -> Result<(), ResourceError> {
        let id = managed_id(decl)?;
        let branch = self.branch_of(decl);
        let forge = self.forge();

        if !file_exists(forge, id.repository(), id.path(), &branch).await? {
            warn!(id = %id, %branch, "file already absent, nothing to delete");
            decl.id = None;
            return Ok(());
        }

        let mut pending = decl.clone();
        pending.comment =
            normalize_comment(decl.comment.as_deref(), ChangeKind::Delete, &decl.file);

        let push = push_until_synched(
            forge,
            &pending,
            &branch,
            ChangeKind::Delete,
            None,
            &self.timeouts,
        )
        .await?;
        info!(id = %id, %branch, push_id = push.push_id, "deleted file");

        decl.id = None;
        Ok(())
    }

    /// Adopt an existing file given `<repository>/<path>[:<branch>]`.
    ///
    /// The branch defaults to the handle's default branch and is pinned in
    /// the returned declaration, which has `overwrite_on_create` off and is
    /// populated by a read.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::InvalidImportId`] for a malformed identifier
    /// - [`ResourceError::FileNotFound`] if the file is not on the branch
    /// - anything [`read`](Self::read) returns
    pub async fn import(&self, raw: &str) -> Result<FileDeclaration, ResourceError> {
        let (id, branch) = ImportId::parse(raw)
            .map_err(ResourceError::InvalidImportId)?
            .into_parts();
        let branch = branch.unwrap_or_else(|| self.default_branch.clone());

        if !file_exists(self.forge(), id.repository(), id.path(), &branch).await? {
            return Err(ResourceError::FileNotFound {
                repository: id.repository().to_string(),
                path: id.path().to_string(),
                branch: branch.to_string(),
            });
        }

        let mut decl = FileDeclaration::new(id.repository(), id.path(), String::new())
            .with_branch(branch)
            .with_overwrite_on_create(false);
        decl.id = Some(id);

        self.read(&mut decl).await?;
        Ok(decl)
    }
}

/// The stored id, provided the declared fields still point at it.
fn managed_id(decl: &FileDeclaration) -> Result<ResourceId, ResourceError> {
    let managed = decl.id.clone().ok_or(ResourceError::MissingId)?;
    let declared = decl.identity().map_err(ResourceError::InvalidId)?;
    if declared != managed {
        return Err(ResourceError::IdentityChanged { managed, declared });
    }
    Ok(managed)
}
