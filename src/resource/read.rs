//! resource::read
//!
//! Reads a managed file's current content and the message of the commit
//! that last touched it.
//!
//! The read runs inside a short bounded [`retry`] because the service can
//! briefly fail to resolve a commit right after a push. Only that case is
//! retried; a missing item means the file is gone.

use std::time::Duration;

use tracing::debug;

use crate::core::types::BranchRef;
use crate::engine::{retry, RetryError, WaitError};
use crate::forge::{Forge, ForgeError, GetItemRequest, VersionDescriptor};

/// Remote state of a managed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    /// Raw text content
    pub content: String,
    /// Message of the commit that last touched the file
    pub comment: Option<String>,
    /// Id of that commit
    pub commit_id: String,
}

/// Read `path` on `branch` of `repository_id`.
///
/// # Errors
///
/// - [`WaitError::Refresh`] with `NotFound` if the file does not exist
/// - [`WaitError::Refresh`] with `ApiError` if the item comes back without
///   its content
/// - [`WaitError::Refresh`] with any other forge failure
/// - [`WaitError::Timeout`] if the commit stays unresolvable for `timeout`
pub async fn read_file(
    forge: &dyn Forge,
    repository_id: &str,
    path: &str,
    branch: &BranchRef,
    timeout: Duration,
) -> Result<FileState, WaitError<ForgeError>> {
    retry(timeout, move || async move {
        let item = forge
            .get_item(GetItemRequest {
                repository_id: repository_id.to_string(),
                path: path.to_string(),
                version: Some(VersionDescriptor::branch(branch.short_name())),
                include_content: true,
            })
            .await
            .map_err(RetryError::NonRetryable)?;
        let content = item.content.ok_or_else(|| {
            RetryError::NonRetryable(ForgeError::ApiError {
                status: 200,
                message: format!("item '{}' was returned without its content", path),
            })
        })?;

        let commit = forge
            .get_commit(repository_id, &item.commit_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    debug!(repository_id, commit_id = %item.commit_id, "commit not visible yet");
                    RetryError::Retryable(e)
                } else {
                    RetryError::NonRetryable(e)
                }
            })?;

        Ok(FileState {
            content,
            comment: commit.comment,
            commit_id: item.commit_id,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge};

    fn forge() -> MockForge {
        MockForge::new()
            .with_repository("repo", "master")
            .with_branch("repo", "feature", "master")
            .with_file("repo", "feature", "docs/a.md", "on feature")
    }

    fn feature() -> BranchRef {
        BranchRef::new("refs/heads/feature").unwrap()
    }

    #[tokio::test]
    async fn reads_content_and_last_touching_commit() {
        let forge = forge();
        forge.commit_out_of_band("repo", "feature", "unrelated.txt", Some("x"));

        let state = read_file(&forge, "repo", "docs/a.md", &feature(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(state.content, "on feature");
        assert_ne!(Some(state.commit_id.clone()), forge.tip("repo", "feature"));
        assert!(state.comment.is_some_and(|c| !c.is_empty()));
    }

    #[tokio::test]
    async fn missing_file_is_not_found_without_retry() {
        let forge = forge();
        let master = BranchRef::default();

        let err = read_file(&forge, "repo", "docs/a.md", &master, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(&err, WaitError::Refresh(e) if e.is_not_found()));
        assert_eq!(forge.operations().len(), 1);
    }

    #[tokio::test]
    async fn unresolvable_commit_times_out() {
        let forge = forge().fail_on(FailOn::GetCommit(ForgeError::NotFound("commit".into())));

        let err = read_file(&forge, "repo", "docs/a.md", &feature(), Duration::from_millis(300))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.cause().is_some_and(ForgeError::is_not_found));
    }

    #[tokio::test]
    async fn other_commit_errors_are_terminal() {
        let forge = forge().fail_on(FailOn::GetCommit(ForgeError::RateLimited));

        let err = read_file(&forge, "repo", "docs/a.md", &feature(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Refresh(ForgeError::RateLimited)));
    }
}
