//! forge::traits
//!
//! Forge trait definition for interacting with the remote repository service.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! All methods return `Result` to handle API errors gracefully.
//!
//! The push operation has compare-and-swap semantics keyed on the branch
//! tip: a [`PushRequest`] carries the commit id the caller believes is the
//! current tip, and the service rejects the push if the branch has moved.
//! Callers recognise that rejection with [`ForgeError::is_stale_ref`].
//!
//! # Example
//!
//! ```ignore
//! use repofile::forge::{ChangeKind, Forge, GitChange, PushRequest, RefUpdate};
//!
//! async fn add_file(forge: &dyn Forge, tip: String) -> Result<i64, ForgeError> {
//!     let push = forge.create_push(PushRequest {
//!         repository_id: "repo".to_string(),
//!         ref_update: RefUpdate {
//!             name: "refs/heads/main".to_string(),
//!             old_object_id: tip,
//!         },
//!         comment: "Add README.md".to_string(),
//!         change: GitChange::with_text(ChangeKind::Add, "README.md", "hello"),
//!     }).await?;
//!     Ok(push.push_id)
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fragment of the service message that identifies a stale push precondition.
pub const STALE_REF_MESSAGE: &str = "has already been updated by another client";

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with the remote repository service.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ForgeError {
    /// Whether the service reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound(_))
    }

    /// Whether a push was rejected because the branch moved after the
    /// caller read its tip.
    pub fn is_stale_ref(&self) -> bool {
        match self {
            ForgeError::ApiError { message, .. } => message.contains(STALE_REF_MESSAGE),
            _ => false,
        }
    }
}

/// Kind of change carried by a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Create a new file
    Add,
    /// Replace the content of an existing file
    Edit,
    /// Remove a file
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "add"),
            ChangeKind::Edit => write!(f, "edit"),
            ChangeKind::Delete => write!(f, "delete"),
        }
    }
}

/// Content type of new file content. Only raw text is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentType {
    /// Plain text content
    #[default]
    #[serde(rename = "rawText")]
    RawText,
}

/// New content for an added or edited file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemContent {
    /// The content itself
    pub content: String,
    /// How the service should interpret `content`
    pub content_type: ContentType,
}

impl ItemContent {
    /// Raw text content.
    pub fn raw_text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: ContentType::RawText,
        }
    }
}

/// A single change within a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitChange {
    /// What happens to the path
    pub kind: ChangeKind,
    /// Path of the file within the repository
    pub path: String,
    /// New content (absent for deletes)
    pub new_content: Option<ItemContent>,
}

impl GitChange {
    /// A change carrying raw text content.
    pub fn with_text(kind: ChangeKind, path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            new_content: Some(ItemContent::raw_text(content)),
        }
    }
}

/// Branch update precondition of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    /// Fully-qualified ref being updated
    pub name: String,
    /// Commit id the caller expects the ref to point at
    pub old_object_id: String,
}

/// Request to create a push: one commit with one change, applied to one
/// branch if and only if the branch still points at `ref_update.old_object_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    /// Target repository
    pub repository_id: String,
    /// Branch and precondition
    pub ref_update: RefUpdate,
    /// Commit message
    pub comment: String,
    /// The single change of the commit
    pub change: GitChange,
}

/// Result of a successful push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    /// Service-assigned push id (positive when the push was recorded)
    pub push_id: i64,
    /// Id of the commit created by the push, if reported
    pub commit_id: Option<String>,
}

/// Branch tip information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchStats {
    /// Bare branch name
    pub name: String,
    /// Commit id at the tip of the branch
    pub commit_id: String,
}

/// Version selector for item and commit queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDescriptor {
    /// Bare branch name
    pub branch: String,
}

impl VersionDescriptor {
    /// Select a branch by bare name.
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            branch: name.into(),
        }
    }
}

/// Request to fetch a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetItemRequest {
    /// Repository holding the file
    pub repository_id: String,
    /// Path of the file
    pub path: String,
    /// Branch to read from (service default branch when absent)
    pub version: Option<VersionDescriptor>,
    /// Whether to inline the file content in the response
    pub include_content: bool,
}

/// A file as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitItem {
    /// Path of the file
    pub path: String,
    /// Commit that last touched the file
    pub commit_id: String,
    /// Inlined content (present when requested)
    pub content: Option<String>,
}

/// Request to list commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCommitsRequest {
    /// Repository to query
    pub repository_id: String,
    /// Maximum number of commits, newest first
    pub top: u32,
    /// Branch to walk (service default branch when absent)
    pub version: Option<VersionDescriptor>,
}

/// Commit information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Commit id
    pub commit_id: String,
    /// Commit message
    pub comment: Option<String>,
}

/// The Forge trait for interacting with the remote repository service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `NotFound`: Branch, item or commit doesn't exist
/// - `ApiError` with a stale-ref message: Push lost a race, re-read and retry
/// - `AuthRequired` / `AuthFailed`: Check credentials
/// - `RateLimited` / `NetworkError`: Surface to the user
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "azuredevops").
    fn name(&self) -> &'static str;

    /// Get the tip of a branch.
    ///
    /// # Arguments
    ///
    /// * `repository_id` - Repository to query
    /// * `name` - Bare branch name (no `refs/heads/` prefix)
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository or branch doesn't exist
    async fn get_branch(&self, repository_id: &str, name: &str)
        -> Result<BranchStats, ForgeError>;

    /// Get a file, optionally with its content.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file doesn't exist at the requested version
    async fn get_item(&self, request: GetItemRequest) -> Result<GitItem, ForgeError>;

    /// Get a commit by id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the commit doesn't exist
    async fn get_commit(&self, repository_id: &str, commit_id: &str)
        -> Result<Commit, ForgeError>;

    /// List the most recent commits on a branch, newest first.
    async fn get_commits(&self, request: GetCommitsRequest) -> Result<Vec<Commit>, ForgeError>;

    /// Submit a push.
    ///
    /// # Errors
    ///
    /// - `ApiError` whose message contains [`STALE_REF_MESSAGE`] if the branch
    ///   no longer points at `ref_update.old_object_id`
    /// - `ApiError` / `NotFound` if the change cannot be applied
    async fn create_push(&self, request: PushRequest) -> Result<Push, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_kind_display() {
        assert_eq!(format!("{}", ChangeKind::Add), "add");
        assert_eq!(format!("{}", ChangeKind::Edit), "edit");
        assert_eq!(format!("{}", ChangeKind::Delete), "delete");
    }

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_string(&ChangeKind::Edit).unwrap(), "\"edit\"");
        assert_eq!(
            serde_json::to_string(&ContentType::RawText).unwrap(),
            "\"rawText\""
        );
    }

    #[test]
    fn stale_ref_classification() {
        let stale = ForgeError::ApiError {
            status: 409,
            message: "TF401028: The reference 'refs/heads/main' has already been updated by another client, so you cannot update it. Please try again.".into(),
        };
        assert!(stale.is_stale_ref());
        assert!(!stale.is_not_found());

        let other = ForgeError::ApiError {
            status: 400,
            message: "bad request".into(),
        };
        assert!(!other.is_stale_ref());
        assert!(!ForgeError::NetworkError(STALE_REF_MESSAGE.into()).is_stale_ref());
    }

    #[test]
    fn not_found_classification() {
        assert!(ForgeError::NotFound("item".into()).is_not_found());
        assert!(!ForgeError::RateLimited.is_not_found());
    }

    #[test]
    fn with_text_is_raw_text() {
        let change = GitChange::with_text(ChangeKind::Add, "a.txt", "hello");
        let content = change.new_content.unwrap();
        assert_eq!(content.content, "hello");
        assert_eq!(content.content_type, ContentType::RawText);
    }

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthRequired),
            "authentication required"
        );
        assert_eq!(
            format!("{}", ForgeError::NotFound("branch main".into())),
            "not found: branch main"
        );
        assert_eq!(format!("{}", ForgeError::RateLimited), "rate limited");
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 409,
                    message: "conflict".into()
                }
            ),
            "API error: 409 - conflict"
        );
        assert_eq!(
            format!("{}", ForgeError::NetworkError("connection refused".into())),
            "network error: connection refused"
        );
    }
}
