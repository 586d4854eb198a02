//! resource::schema
//!
//! The declared (and read-back) state of a managed repository file.
//!
//! # Fields
//!
//! | Field | Required | Mutable | Notes |
//! |---|---|---|---|
//! | `repository_id` | yes | no | Replacing it replaces the file |
//! | `file` | yes | no | Path within the repository |
//! | `content` | yes | yes | A change triggers an update push |
//! | `branch` | no | no | Defaults to the resource's default branch, pinned on create |
//! | `comment` | no | computed | Commit message, read back from the last commit touching the file |
//! | `overwrite_on_create` | no | no | Defaults to `false` |
//!
//! `id` is computed: it is set by create and import, and cleared when the
//! file is deleted or found missing on read.

use serde::{Deserialize, Serialize};

use crate::core::types::{BranchRef, ResourceId, TypeError};

/// Desired state of one file, plus the computed identity.
///
/// Serializes to JSON so the state can be persisted between lifecycle calls.
///
/// # Example
///
/// ```
/// use repofile::resource::FileDeclaration;
///
/// let decl = FileDeclaration::new("repo", "README.md", "hello").with_comment("Seed readme");
/// assert!(decl.branch.is_none());
/// assert!(!decl.overwrite_on_create);
/// assert_eq!(decl.identity().unwrap().to_string(), "repo/README.md");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDeclaration {
    /// Engine identity, `<repository_id>/<file>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,

    /// Repository holding the file
    pub repository_id: String,

    /// Path of the file within the repository
    pub file: String,

    /// Raw text content
    pub content: String,

    /// Branch reference; `None` means the resource's default branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchRef>,

    /// Commit message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Allow create to overwrite a file that already exists
    #[serde(default)]
    pub overwrite_on_create: bool,
}

impl FileDeclaration {
    /// Declare `file` in `repository_id` with the given content on the
    /// default branch.
    pub fn new(
        repository_id: impl Into<String>,
        file: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            repository_id: repository_id.into(),
            file: file.into(),
            content: content.into(),
            branch: None,
            comment: None,
            overwrite_on_create: false,
        }
    }

    /// Target a specific branch.
    pub fn with_branch(mut self, branch: BranchRef) -> Self {
        self.branch = Some(branch);
        self
    }

    /// Set an explicit commit message.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Allow create to overwrite an existing file.
    pub fn with_overwrite_on_create(mut self, overwrite: bool) -> Self {
        self.overwrite_on_create = overwrite;
        self
    }

    /// The identity this declaration maps to.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidResourceId` if `repository_id` or `file`
    /// cannot form an identity.
    pub fn identity(&self) -> Result<ResourceId, TypeError> {
        ResourceId::new(self.repository_id.as_str(), self.file.as_str())
    }

    /// The declared branch, or `default` when none is declared.
    pub fn branch_or<'a>(&'a self, default: &'a BranchRef) -> &'a BranchRef {
        self.branch.as_ref().unwrap_or(default)
    }

    /// Whether moving from `self` to `desired` changes a field that cannot be
    /// updated in place, so the file must be deleted and created again.
    ///
    /// Undeclared branches compare as `default_branch`.
    pub fn requires_replacement(
        &self,
        desired: &FileDeclaration,
        default_branch: &BranchRef,
    ) -> bool {
        self.repository_id != desired.repository_id
            || self.file != desired.file
            || self.branch_or(default_branch) != desired.branch_or(default_branch)
            || self.overwrite_on_create != desired.overwrite_on_create
    }
}
