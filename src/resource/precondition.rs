//! resource::precondition
//!
//! Read-only checks run before the lifecycle operations touch a file.
//!
//! Branch lookups go through [`BranchRef::short_name`] because the service
//! expects a bare branch name. A missing branch is reported as
//! [`ResourceError::BranchNotFound`]; a missing file is just `false`.

use tracing::debug;

use super::ResourceError;
use crate::core::types::BranchRef;
use crate::forge::{Forge, ForgeError, GetItemRequest, VersionDescriptor};

/// Whether `branch` exists in `repository_id`.
///
/// # Errors
///
/// Any forge failure other than not-found.
pub async fn branch_exists(
    forge: &dyn Forge,
    repository_id: &str,
    branch: &BranchRef,
) -> Result<bool, ForgeError> {
    match forge.get_branch(repository_id, branch.short_name()).await {
        Ok(stats) => {
            debug!(repository_id, branch = %branch, tip = %stats.commit_id, "branch found");
            Ok(true)
        }
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Fail unless `branch` exists in `repository_id`.
///
/// # Errors
///
/// - [`ResourceError::BranchNotFound`] if the branch is missing
/// - [`ResourceError::Forge`] for any other failure
pub async fn require_branch(
    forge: &dyn Forge,
    repository_id: &str,
    branch: &BranchRef,
) -> Result<(), ResourceError> {
    if branch_exists(forge, repository_id, branch).await? {
        Ok(())
    } else {
        Err(ResourceError::BranchNotFound {
            repository: repository_id.to_string(),
            branch: branch.to_string(),
        })
    }
}

/// Whether `path` exists on `branch` of `repository_id`.
///
/// # Errors
///
/// Any forge failure other than not-found.
pub async fn file_exists(
    forge: &dyn Forge,
    repository_id: &str,
    path: &str,
    branch: &BranchRef,
) -> Result<bool, ForgeError> {
    let request = GetItemRequest {
        repository_id: repository_id.to_string(),
        path: path.to_string(),
        version: Some(VersionDescriptor::branch(branch.short_name())),
        include_content: false,
    };

    match forge.get_item(request).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};

    fn forge() -> MockForge {
        MockForge::new()
            .with_repository("repo", "master")
            .with_file("repo", "master", "README.md", "hello")
    }

    fn branch(name: &str) -> BranchRef {
        BranchRef::new(name).unwrap()
    }

    #[tokio::test]
    async fn branch_lookup_uses_bare_name() {
        let forge = forge();
        assert!(branch_exists(&forge, "repo", &branch("refs/heads/master"))
            .await
            .unwrap());

        assert_eq!(
            forge.operations(),
            vec![MockOperation::GetBranch {
                repository_id: "repo".into(),
                name: "master".into(),
            }]
        );
    }

    #[tokio::test]
    async fn missing_branch_is_false() {
        let forge = forge();
        assert!(!branch_exists(&forge, "repo", &branch("refs/heads/doesnotexist"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn require_branch_names_missing_branch() {
        let forge = forge();
        let err = require_branch(&forge, "repo", &branch("refs/heads/doesnotexist"))
            .await
            .unwrap_err();

        assert!(matches!(err, ResourceError::BranchNotFound { .. }));
        assert!(err.to_string().contains("refs/heads/doesnotexist"));
    }

    #[tokio::test]
    async fn branch_errors_propagate() {
        let forge = forge().fail_on(FailOn::GetBranch(ForgeError::AuthFailed(
            "bad token".into(),
        )));
        let err = require_branch(&forge, "repo", &branch("refs/heads/master"))
            .await
            .unwrap_err();

        assert!(matches!(err, ResourceError::Forge(ForgeError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn file_probe_targets_branch() {
        let forge = forge().with_branch("repo", "feature", "master");
        forge.commit_out_of_band("repo", "feature", "only-on-feature.txt", Some("x"));

        let master = branch("refs/heads/master");
        let feature = branch("refs/heads/feature");

        assert!(file_exists(&forge, "repo", "README.md", &master).await.unwrap());
        assert!(!file_exists(&forge, "repo", "only-on-feature.txt", &master)
            .await
            .unwrap());
        assert!(file_exists(&forge, "repo", "only-on-feature.txt", &feature)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn file_probe_propagates_other_errors() {
        let forge = forge().fail_on(FailOn::GetItem(ForgeError::NetworkError("reset".into())));
        let err = file_exists(&forge, "repo", "README.md", &branch("master"))
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeError::NetworkError(_)));
    }
}
