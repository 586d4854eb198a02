//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchRef`] - Branch reference as declared in configuration
//! - [`ResourceId`] - Engine-facing identity of a managed file (`<repository>/<path>`)
//! - [`ImportId`] - External import identifier (`<repository>/<path>[:<branch>]`)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use repofile::core::types::{BranchRef, ImportId, ResourceId};
//!
//! let branch = BranchRef::new("refs/heads/main").unwrap();
//! assert_eq!(branch.short_name(), "main");
//!
//! let id = ResourceId::parse("repo/docs/readme.md").unwrap();
//! assert_eq!(id.path(), "docs/readme.md");
//!
//! let import = ImportId::parse("repo/readme.md:refs/heads/feature").unwrap();
//! assert_eq!(import.branch().unwrap().as_str(), "refs/heads/feature");
//!
//! assert!(BranchRef::new("").is_err());
//! assert!(ImportId::parse("repo/file:a:b").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix decorating fully-qualified branch references.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Branch used when a declaration or import omits one.
pub const DEFAULT_BRANCH: &str = "refs/heads/master";

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch reference: {0}")]
    InvalidBranchRef(String),

    #[error("invalid resource id '{0}': must be written as <repository>/<file path>")]
    InvalidResourceId(String),

    #[error(
        "invalid import id '{0}': must be written as <repository>/<file path> \
         (when branch is the default branch) or <repository>/<file path>:<branch>"
    )]
    InvalidImportId(String),
}

/// A branch reference as it appears in a declaration.
///
/// Usually fully qualified (`refs/heads/main`), but bare names (`main`) are
/// accepted as well. The remote service's branch lookups expect a bare name,
/// see [`BranchRef::short_name`].
///
/// Branch references cannot be empty, cannot contain whitespace or control
/// characters, and cannot contain `:` (the import id branch delimiter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchRef(String);

impl BranchRef {
    /// Create a new validated branch reference.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchRef` if the reference is malformed.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchRef(
                "branch reference cannot be empty".into(),
            ));
        }
        if name == BRANCH_REF_PREFIX {
            return Err(TypeError::InvalidBranchRef(format!(
                "branch reference '{name}' has no branch name"
            )));
        }
        if name.contains(':') {
            return Err(TypeError::InvalidBranchRef(format!(
                "branch reference '{name}' cannot contain ':'"
            )));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidBranchRef(format!(
                "branch reference '{name}' cannot contain whitespace or control characters"
            )));
        }
        Ok(())
    }

    /// Get the reference exactly as declared.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the bare branch name, with any `refs/heads/` decoration removed.
    pub fn short_name(&self) -> &str {
        self.0.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(&self.0)
    }

    /// Whether the reference is fully qualified (`refs/heads/...`).
    pub fn is_qualified(&self) -> bool {
        self.0.starts_with(BRANCH_REF_PREFIX)
    }

    /// The fully-qualified form, as push ref updates expect it.
    pub fn qualified(&self) -> String {
        if self.is_qualified() {
            self.0.clone()
        } else {
            format!("{}{}", BRANCH_REF_PREFIX, self.0)
        }
    }
}

impl Default for BranchRef {
    fn default() -> Self {
        Self(DEFAULT_BRANCH.to_string())
    }
}

impl TryFrom<String> for BranchRef {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchRef> for String {
    fn from(value: BranchRef) -> Self {
        value.0
    }
}

impl std::fmt::Display for BranchRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a managed file as seen by the declarative engine.
///
/// Rendered as `<repository>/<path>`. The branch is deliberately not part of
/// the identity: two declarations for the same path on different branches
/// share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    repository: String,
    path: String,
}

impl ResourceId {
    /// Build an identity from its parts.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidResourceId` if the repository is empty or
    /// contains `/`, or if the path is empty.
    pub fn new(repository: impl Into<String>, path: impl Into<String>) -> Result<Self, TypeError> {
        let repository = repository.into();
        let path = path.into();
        if repository.is_empty() || repository.contains('/') || path.is_empty() {
            return Err(TypeError::InvalidResourceId(format!("{repository}/{path}")));
        }
        Ok(Self { repository, path })
    }

    /// Parse `<repository>/<path>`, splitting on the first `/`.
    ///
    /// Everything after the first `/` is the path, so `a/b/c` yields
    /// repository `a` and path `b/c`.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidResourceId` when either part is missing.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (repository, path) = s
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidResourceId(s.to_string()))?;
        if repository.is_empty() || path.is_empty() {
            return Err(TypeError::InvalidResourceId(s.to_string()));
        }
        Ok(Self {
            repository: repository.to_string(),
            path: path.to_string(),
        })
    }

    /// The repository part.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// The file path part.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(value: ResourceId) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.repository, self.path)
    }
}

/// Identifier accepted by import: `<repository>/<path>` or
/// `<repository>/<path>:<branch>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    resource: ResourceId,
    branch: Option<BranchRef>,
}

impl ImportId {
    /// Parse an import identifier.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidImportId` if there is more than one
    /// `:`-delimited branch segment, the branch segment is empty or invalid,
    /// or the `<repository>/<path>` part is malformed.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidImportId(s.to_string());

        let parts: Vec<&str> = s.split(':').collect();
        let (id, branch) = match parts.as_slice() {
            [id] => (*id, None),
            [id, branch] => (*id, Some(BranchRef::new(*branch).map_err(|_| invalid())?)),
            _ => return Err(invalid()),
        };

        let resource = ResourceId::parse(id).map_err(|_| invalid())?;
        Ok(Self { resource, branch })
    }

    /// The identity part.
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    /// The explicit branch, if one was given.
    pub fn branch(&self) -> Option<&BranchRef> {
        self.branch.as_ref()
    }

    /// Split into identity and branch.
    pub fn into_parts(self) -> (ResourceId, Option<BranchRef>) {
        (self.resource, self.branch)
    }
}
