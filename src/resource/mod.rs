//! resource
//!
//! The repository file resource: one file in a remote git repository,
//! declared by configuration and reconciled against the service.
//!
//! # Architecture
//!
//! A lifecycle call runs the precondition checks, then either pushes a change
//! through the reconciler or reads the remote state back:
//!
//! ```text
//! create / update / delete          read / import
//!          │                              │
//!   precondition ──► push ──► reconcile   precondition ──► read
//! ```
//!
//! # Modules
//!
//! - [`schema`]: The declaration persisted between lifecycle calls
//! - [`precondition`]: Branch and file existence checks
//! - [`push`]: Single-change push construction and commit messages
//! - [`reconcile`]: Compare-and-swap push loop
//! - [`read`]: Bounded read of content and last commit message
//! - `lifecycle`: Create, read, update, delete and import
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use repofile::forge::mock::MockForge;
//! use repofile::resource::{FileDeclaration, RepositoryFileResource};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_repository("repo", "master");
//! let resource = RepositoryFileResource::new(Arc::new(forge));
//!
//! let mut decl = FileDeclaration::new("repo", "README.md", "hello");
//! resource.create(&mut decl).await.unwrap();
//! assert_eq!(decl.id.as_ref().unwrap().to_string(), "repo/README.md");
//! assert_eq!(decl.comment.as_deref(), Some("Add README.md"));
//! # });
//! ```

mod lifecycle;
pub mod precondition;
pub mod push;
pub mod read;
pub mod reconcile;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::types::{BranchRef, ResourceId, TypeError};
use crate::engine::WaitError;
use crate::forge::{ChangeKind, Forge, ForgeError};

pub use read::FileState;
pub use reconcile::PushState;
pub use schema::FileDeclaration;

/// Errors from resource lifecycle operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Import identifier is malformed.
    #[error(transparent)]
    InvalidImportId(TypeError),

    /// Declaration cannot form a valid identity.
    #[error(transparent)]
    InvalidId(TypeError),

    /// Read, update or delete of a declaration that was never created or
    /// imported.
    #[error("resource has no id; create or import it first")]
    MissingId,

    /// `repository_id` or `file` was changed on a managed declaration.
    #[error(
        "declaration now points at '{declared}' but manages '{managed}'; \
         repository_id and file cannot change in place, delete and create instead"
    )]
    IdentityChanged {
        /// The id stored by create or import
        managed: ResourceId,
        /// The id the declared fields form now
        declared: ResourceId,
    },

    /// Create found the file already present and overwriting is disabled.
    #[error(
        "Refusing to overwrite existing file '{path}'. \
         Configure `overwrite_on_create` to `true` to override."
    )]
    RefuseOverwrite {
        /// Path of the existing file
        path: String,
    },

    /// The declared branch does not exist.
    #[error("Branch \"{branch}\" does not exist in repository [{repository}]")]
    BranchNotFound {
        /// Repository that was searched
        repository: String,
        /// Branch reference as declared
        branch: String,
    },

    /// Import target does not exist.
    #[error("file '{path}' does not exist on branch \"{branch}\" of repository [{repository}]")]
    FileNotFound {
        /// Repository that was searched
        repository: String,
        /// Path that was not found
        path: String,
        /// Branch that was searched
        branch: String,
    },

    /// The push never landed.
    #[error("failed to push {kind} of '{path}' to repository [{repository}]: {source}")]
    Push {
        /// Target repository
        repository: String,
        /// Target path
        path: String,
        /// Change being pushed
        kind: ChangeKind,
        /// Terminal error or timeout
        source: WaitError<ForgeError>,
    },

    /// Reading the file back failed.
    #[error("failed to read '{path}' from repository [{repository}]: {source}")]
    Read {
        /// Repository read from
        repository: String,
        /// Path read
        path: String,
        /// Terminal error or timeout
        source: WaitError<ForgeError>,
    },

    /// Forge call outside a push or read loop failed.
    #[error(transparent)]
    Forge(#[from] ForgeError),
}

impl ResourceError {
    /// Whether the error means the file no longer exists remotely.
    ///
    /// The declaration's id has been cleared when this is true.
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            ResourceError::Read {
                source: WaitError::Refresh(e),
                ..
            } if e.is_not_found()
        )
    }
}

/// Time limits for lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Total time the push loop may run
    pub push: Duration,
    /// Total time a read may spend retrying
    pub read: Duration,
    /// Smallest pause between push attempts
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            push: Duration::from_secs(600),
            read: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Lifecycle handle for repository files managed through one forge.
///
/// Holds no per-file state: each call works on the [`FileDeclaration`] it is
/// given, so one handle can serve many files concurrently.
#[derive(Clone)]
pub struct RepositoryFileResource {
    forge: Arc<dyn Forge>,
    timeouts: Timeouts,
    default_branch: BranchRef,
}

impl RepositoryFileResource {
    /// Create a handle with default timeouts and `refs/heads/master` as the
    /// default branch.
    pub fn new(forge: Arc<dyn Forge>) -> Self {
        Self {
            forge,
            timeouts: Timeouts::default(),
            default_branch: BranchRef::default(),
        }
    }

    /// Override the time limits.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Branch used by declarations and imports that don't name one.
    pub fn with_default_branch(mut self, branch: BranchRef) -> Self {
        self.default_branch = branch;
        self
    }

    /// The configured time limits.
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Branch used by declarations that don't name one.
    pub fn default_branch(&self) -> &BranchRef {
        &self.default_branch
    }

    /// Whether moving from `prior` to `desired` needs a delete and a create
    /// rather than an update.
    pub fn requires_replacement(&self, prior: &FileDeclaration, desired: &FileDeclaration) -> bool {
        prior.requires_replacement(desired, &self.default_branch)
    }

    /// The branch `decl` targets.
    fn branch_of(&self, decl: &FileDeclaration) -> BranchRef {
        decl.branch_or(&self.default_branch).clone()
    }

    fn forge(&self) -> &dyn Forge {
        self.forge.as_ref()
    }
}

impl std::fmt::Debug for RepositoryFileResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryFileResource")
            .field("forge", &self.forge.name())
            .field("timeouts", &self.timeouts)
            .field("default_branch", &self.default_branch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.push, Duration::from_secs(600));
        assert_eq!(timeouts.read, Duration::from_secs(5));
        assert_eq!(timeouts.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn branch_not_found_message() {
        let err = ResourceError::BranchNotFound {
            repository: "repo".into(),
            branch: "refs/heads/doesnotexist".into(),
        };
        assert!(err
            .to_string()
            .starts_with("Branch \"refs/heads/doesnotexist\" does not exist"));
    }

    #[test]
    fn gone_only_for_missing_item() {
        let gone = ResourceError::Read {
            repository: "repo".into(),
            path: "a.txt".into(),
            source: WaitError::Refresh(ForgeError::NotFound("item".into())),
        };
        assert!(gone.is_gone());

        let failed = ResourceError::Read {
            repository: "repo".into(),
            path: "a.txt".into(),
            source: WaitError::Refresh(ForgeError::RateLimited),
        };
        assert!(!failed.is_gone());
        assert!(!ResourceError::MissingId.is_gone());
    }

    #[test]
    fn identity_changed_names_both_ids() {
        let err = ResourceError::IdentityChanged {
            managed: ResourceId::new("repo", "a.txt").unwrap(),
            declared: ResourceId::new("repo", "b.txt").unwrap(),
        };
        let message = err.to_string();
        assert!(message.contains("'repo/b.txt'"), "{message}");
        assert!(message.contains("'repo/a.txt'"), "{message}");
    }
}
