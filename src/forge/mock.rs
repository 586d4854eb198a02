//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge provides a deterministic implementation of the `Forge` trait
//! for use in tests. It keeps repositories in memory as a chain of commits,
//! each carrying a full snapshot of the tree, and enforces the same
//! compare-and-swap rule on pushes as the real service.
//!
//! Besides per-operation failure injection, the mock can simulate concurrent
//! writers: [`MockForge::race_next_pushes`] makes the next pushes lose the race
//! because another client advanced the branch just before they were evaluated.
//!
//! # Example
//!
//! ```
//! use repofile::forge::mock::MockForge;
//! use repofile::forge::{Forge, GetItemRequest};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new()
//!     .with_repository("repo", "main")
//!     .with_file("repo", "main", "README.md", "hello");
//!
//! let item = forge.get_item(GetItemRequest {
//!     repository_id: "repo".to_string(),
//!     path: "README.md".to_string(),
//!     version: None,
//!     include_content: true,
//! }).await.unwrap();
//!
//! assert_eq!(item.content.as_deref(), Some("hello"));
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::traits::{
    BranchStats, ChangeKind, Commit, Forge, ForgeError, GetCommitsRequest, GetItemRequest,
    GitItem, Push, PushRequest, STALE_REF_MESSAGE,
};
use crate::core::types::BRANCH_REF_PREFIX;

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state,
/// so a test can hand one clone to the code under test and inspect another.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    /// Repositories by id.
    repositories: HashMap<String, MockRepository>,
    /// Next push id to assign.
    next_push_id: i64,
    /// Counter mixed into commit ids so identical commits differ.
    commit_counter: u64,
    /// Number of upcoming pushes that lose a race to a concurrent writer.
    pending_races: u32,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Default)]
struct MockRepository {
    /// Branch used when a request carries no version.
    default_branch: String,
    /// Bare branch name -> tip commit id.
    branches: HashMap<String, String>,
    /// Commit id -> commit.
    commits: HashMap<String, MockCommit>,
}

#[derive(Debug, Clone)]
struct MockCommit {
    comment: String,
    parent: Option<String>,
    tree: BTreeMap<String, String>,
    touched: Option<String>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail get_branch with the given error.
    GetBranch(ForgeError),
    /// Fail get_item with the given error.
    GetItem(ForgeError),
    /// Fail get_commit with the given error.
    GetCommit(ForgeError),
    /// Fail get_commits with the given error.
    GetCommits(ForgeError),
    /// Fail create_push with the given error.
    CreatePush(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetBranch {
        repository_id: String,
        name: String,
    },
    GetItem {
        repository_id: String,
        path: String,
        branch: Option<String>,
        include_content: bool,
    },
    GetCommit {
        repository_id: String,
        commit_id: String,
    },
    GetCommits {
        repository_id: String,
        top: u32,
        branch: Option<String>,
    },
    CreatePush {
        repository_id: String,
        ref_name: String,
        old_object_id: String,
        kind: ChangeKind,
        path: String,
        comment: String,
    },
}

impl MockForge {
    /// Create a new mock forge with no repositories.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                repositories: HashMap::new(),
                next_push_id: 1,
                commit_counter: 0,
                pending_races: 0,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Add a repository whose default branch holds a single empty commit.
    pub fn with_repository(self, repository_id: &str, default_branch: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let commit_id = inner.next_commit_id("Initial commit");
            let mut repo = MockRepository {
                default_branch: bare(default_branch).to_string(),
                ..MockRepository::default()
            };
            repo.commits.insert(
                commit_id.clone(),
                MockCommit {
                    comment: "Initial commit".to_string(),
                    parent: None,
                    tree: BTreeMap::new(),
                    touched: None,
                },
            );
            repo.branches
                .insert(bare(default_branch).to_string(), commit_id);
            inner
                .repositories
                .insert(repository_id.to_string(), repo);
        }
        self
    }

    /// Create `branch` pointing at the current tip of `from`.
    ///
    /// Does nothing if the repository or `from` doesn't exist.
    pub fn with_branch(self, repository_id: &str, branch: &str, from: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(repo) = inner.repositories.get_mut(repository_id) {
                if let Some(tip) = repo.branches.get(bare(from)).cloned() {
                    repo.branches.insert(bare(branch).to_string(), tip);
                }
            }
        }
        self
    }

    /// Commit a file directly to a branch.
    pub fn with_file(self, repository_id: &str, branch: &str, path: &str, content: &str) -> Self {
        self.commit_out_of_band(repository_id, branch, path, Some(content));
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use repofile::forge::mock::{MockForge, FailOn};
    /// use repofile::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreatePush(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Make the next `count` pushes lose a race against a concurrent writer.
    ///
    /// Before each of those pushes is evaluated, another client commits to the
    /// target branch, so the push's precondition is stale and it is rejected
    /// the way the real service rejects it.
    pub fn race_next_pushes(&self, count: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.pending_races = count;
    }

    /// Commit a change to a branch as another client would.
    ///
    /// `Some(content)` writes the file, `None` removes it. Returns the new
    /// tip, or `None` if the repository or branch doesn't exist.
    pub fn commit_out_of_band(
        &self,
        repository_id: &str,
        branch: &str,
        path: &str,
        content: Option<&str>,
    ) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        let comment = match content {
            Some(_) => format!("Out-of-band write to {}", path),
            None => format!("Out-of-band delete of {}", path),
        };
        inner.commit(repository_id, bare(branch), path, content, &comment)
    }

    /// Get all recorded operations.
    ///
    /// Useful for verifying the mock was called correctly.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Number of push attempts recorded, successful or not.
    pub fn push_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::CreatePush { .. }))
            .count()
    }

    /// Get a file's content on a branch (for test verification).
    pub fn file_content(&self, repository_id: &str, branch: &str, path: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let repo = inner.repositories.get(repository_id)?;
        let tip = repo.branches.get(bare(branch))?;
        repo.commits.get(tip)?.tree.get(normalize(path)).cloned()
    }

    /// Get the tip commit of a branch (for test verification).
    pub fn tip(&self, repository_id: &str, branch: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .repositories
            .get(repository_id)?
            .branches
            .get(bare(branch))
            .cloned()
    }

    /// Get the message of the tip commit of a branch (for test verification).
    pub fn tip_comment(&self, repository_id: &str, branch: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        let repo = inner.repositories.get(repository_id)?;
        let tip = repo.branches.get(bare(branch))?;
        repo.commits.get(tip).map(|c| c.comment.clone())
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail<T>(&self, expected: &str) -> Option<Result<T, ForgeError>> {
        let inner = self.inner.lock().unwrap();
        match &inner.fail_on {
            Some(FailOn::GetBranch(e)) if expected == "get_branch" => Some(Err(e.clone())),
            Some(FailOn::GetItem(e)) if expected == "get_item" => Some(Err(e.clone())),
            Some(FailOn::GetCommit(e)) if expected == "get_commit" => Some(Err(e.clone())),
            Some(FailOn::GetCommits(e)) if expected == "get_commits" => Some(Err(e.clone())),
            Some(FailOn::CreatePush(e)) if expected == "create_push" => Some(Err(e.clone())),
            _ => None,
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForgeInner {
    fn next_commit_id(&mut self, seed: &str) -> String {
        self.commit_counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(self.commit_counter.to_be_bytes());
        hasher.update(seed.as_bytes());
        let mut id = hex::encode(hasher.finalize());
        id.truncate(40);
        id
    }

    /// Append a commit touching `path` to `branch`; returns the new tip.
    fn commit(
        &mut self,
        repository_id: &str,
        branch: &str,
        path: &str,
        content: Option<&str>,
        comment: &str,
    ) -> Option<String> {
        let commit_id = self.next_commit_id(comment);
        let repo = self.repositories.get_mut(repository_id)?;
        let parent = repo.branches.get(branch)?.clone();
        let mut tree = repo.commits.get(&parent)?.tree.clone();

        let path = normalize(path).to_string();
        match content {
            Some(content) => {
                tree.insert(path.clone(), content.to_string());
            }
            None => {
                tree.remove(&path);
            }
        }

        repo.commits.insert(
            commit_id.clone(),
            MockCommit {
                comment: comment.to_string(),
                parent: Some(parent),
                tree,
                touched: Some(path),
            },
        );
        repo.branches.insert(branch.to_string(), commit_id.clone());
        Some(commit_id)
    }
}

impl MockRepository {
    fn resolve_branch(&self, branch: Option<&str>) -> Result<&str, ForgeError> {
        let name = branch.unwrap_or(self.default_branch.as_str());
        self.branches
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", name)))
    }

    /// The most recent commit reachable from `tip` that touched `path`.
    fn last_touch<'a>(&'a self, tip: &'a str, path: &str) -> Option<&'a str> {
        let mut cursor = Some(tip);
        while let Some(id) = cursor {
            let commit = self.commits.get(id)?;
            if commit.touched.as_deref() == Some(path) {
                return Some(id);
            }
            cursor = commit.parent.as_deref();
        }
        None
    }
}

fn bare(branch: &str) -> &str {
    branch.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(branch)
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

fn repository_not_found(repository_id: &str) -> ForgeError {
    ForgeError::NotFound(format!("repository '{}'", repository_id))
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_branch(
        &self,
        repository_id: &str,
        name: &str,
    ) -> Result<BranchStats, ForgeError> {
        self.record(MockOperation::GetBranch {
            repository_id: repository_id.to_string(),
            name: name.to_string(),
        });

        if let Some(result) = self.check_fail("get_branch") {
            return result;
        }

        let inner = self.inner.lock().unwrap();
        let repo = inner
            .repositories
            .get(repository_id)
            .ok_or_else(|| repository_not_found(repository_id))?;
        let commit_id = repo.resolve_branch(Some(name))?;

        Ok(BranchStats {
            name: name.to_string(),
            commit_id: commit_id.to_string(),
        })
    }

    async fn get_item(&self, request: GetItemRequest) -> Result<GitItem, ForgeError> {
        let branch = request.version.as_ref().map(|v| v.branch.clone());
        self.record(MockOperation::GetItem {
            repository_id: request.repository_id.clone(),
            path: request.path.clone(),
            branch: branch.clone(),
            include_content: request.include_content,
        });

        if let Some(result) = self.check_fail("get_item") {
            return result;
        }

        let inner = self.inner.lock().unwrap();
        let repo = inner
            .repositories
            .get(&request.repository_id)
            .ok_or_else(|| repository_not_found(&request.repository_id))?;
        let tip = repo.resolve_branch(branch.as_deref())?;
        let path = normalize(&request.path);
        let not_found = || ForgeError::NotFound(format!("item '{}'", request.path));

        let content = repo
            .commits
            .get(tip)
            .and_then(|c| c.tree.get(path))
            .ok_or_else(not_found)?;
        let commit_id = repo.last_touch(tip, path).ok_or_else(not_found)?;

        Ok(GitItem {
            path: format!("/{}", path),
            commit_id: commit_id.to_string(),
            content: request.include_content.then(|| content.clone()),
        })
    }

    async fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<Commit, ForgeError> {
        self.record(MockOperation::GetCommit {
            repository_id: repository_id.to_string(),
            commit_id: commit_id.to_string(),
        });

        if let Some(result) = self.check_fail("get_commit") {
            return result;
        }

        let inner = self.inner.lock().unwrap();
        let repo = inner
            .repositories
            .get(repository_id)
            .ok_or_else(|| repository_not_found(repository_id))?;
        let commit = repo
            .commits
            .get(commit_id)
            .ok_or_else(|| ForgeError::NotFound(format!("commit '{}'", commit_id)))?;

        Ok(Commit {
            commit_id: commit_id.to_string(),
            comment: Some(commit.comment.clone()),
        })
    }

    async fn get_commits(&self, request: GetCommitsRequest) -> Result<Vec<Commit>, ForgeError> {
        let branch = request.version.as_ref().map(|v| v.branch.clone());
        self.record(MockOperation::GetCommits {
            repository_id: request.repository_id.clone(),
            top: request.top,
            branch: branch.clone(),
        });

        if let Some(result) = self.check_fail("get_commits") {
            return result;
        }

        let inner = self.inner.lock().unwrap();
        let repo = inner
            .repositories
            .get(&request.repository_id)
            .ok_or_else(|| repository_not_found(&request.repository_id))?;
        let tip = repo.resolve_branch(branch.as_deref())?;

        let mut commits = Vec::new();
        let mut cursor = Some(tip);
        while let Some(id) = cursor {
            if commits.len() >= request.top as usize {
                break;
            }
            let Some(commit) = repo.commits.get(id) else {
                break;
            };
            commits.push(Commit {
                commit_id: id.to_string(),
                comment: Some(commit.comment.clone()),
            });
            cursor = commit.parent.as_deref();
        }

        Ok(commits)
    }

    async fn create_push(&self, request: PushRequest) -> Result<Push, ForgeError> {
        self.record(MockOperation::CreatePush {
            repository_id: request.repository_id.clone(),
            ref_name: request.ref_update.name.clone(),
            old_object_id: request.ref_update.old_object_id.clone(),
            kind: request.change.kind,
            path: request.change.path.clone(),
            comment: request.comment.clone(),
        });

        if let Some(result) = self.check_fail("create_push") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        let branch = bare(&request.ref_update.name).to_string();

        if inner.pending_races > 0 {
            inner.pending_races -= 1;
            let racer = format!(".concurrent/{}", inner.commit_counter);
            inner.commit(
                &request.repository_id,
                &branch,
                &racer,
                Some("concurrent"),
                "Concurrent writer",
            );
        }

        let repo = inner
            .repositories
            .get(&request.repository_id)
            .ok_or_else(|| repository_not_found(&request.repository_id))?;
        let tip = repo.resolve_branch(Some(&branch))?;

        if tip != request.ref_update.old_object_id {
            return Err(ForgeError::ApiError {
                status: 409,
                message: format!(
                    "TF401028: The reference '{}' {}, so you cannot update it. Please try again.",
                    request.ref_update.name, STALE_REF_MESSAGE
                ),
            });
        }

        let path = normalize(&request.change.path);
        let exists = repo
            .commits
            .get(tip)
            .is_some_and(|c| c.tree.contains_key(path));

        match request.change.kind {
            ChangeKind::Add if exists => {
                return Err(ForgeError::ApiError {
                    status: 400,
                    message: format!(
                        "The path '{}' specified in the add operation already exists.",
                        request.change.path
                    ),
                });
            }
            ChangeKind::Edit | ChangeKind::Delete if !exists => {
                return Err(ForgeError::NotFound(format!(
                    "TF401174: The item '{}' could not be found in the repository",
                    request.change.path
                )));
            }
            _ => {}
        }

        let content = request
            .change
            .new_content
            .as_ref()
            .map(|c| c.content.as_str());
        let content = match request.change.kind {
            ChangeKind::Delete => None,
            ChangeKind::Add | ChangeKind::Edit => Some(content.unwrap_or_default()),
        };

        let commit_id = inner
            .commit(
                &request.repository_id,
                &branch,
                path,
                content,
                &request.comment,
            )
            .ok_or_else(|| repository_not_found(&request.repository_id))?;

        let push_id = inner.next_push_id;
        inner.next_push_id += 1;

        Ok(Push {
            push_id,
            commit_id: Some(commit_id),
        })
    }
}
