//! resource::reconcile
//!
//! Optimistic-concurrency push loop.
//!
//! # Design
//!
//! The service's push is a compare-and-swap on the branch tip. Each attempt:
//!
//! 1. reads the branch's latest commit id (failure is terminal),
//! 2. builds a push conditional on that id,
//! 3. submits it.
//!
//! A push rejected because another client moved the branch first leaves the
//! loop in [`PushState::Waiting`] and is retried with a fresh tip. Any other
//! rejection ends the loop. A successful push with a valid id reaches
//! [`PushState::Synched`].
//!
//! There is no client-side lock; concurrent writers are serialized entirely
//! by the service rejecting stale pushes.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use super::push::build_push;
use super::schema::FileDeclaration;
use super::{ResourceError, Timeouts};
use crate::core::types::BranchRef;
use crate::engine::{Refresh, StateChangeConf};
use crate::forge::{ChangeKind, Forge, ForgeError, GetCommitsRequest, Push, VersionDescriptor};

/// State of the push loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// No push has landed yet
    Waiting,
    /// The push landed
    Synched,
}

impl fmt::Display for PushState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushState::Waiting => write!(f, "Waiting"),
            PushState::Synched => write!(f, "Synched"),
        }
    }
}

/// The id of the newest commit on `branch`.
///
/// # Errors
///
/// Forge failures, or `NotFound` if the branch has no commits.
pub async fn latest_commit_id(
    forge: &dyn Forge,
    repository_id: &str,
    branch: &BranchRef,
) -> Result<String, ForgeError> {
    let commits = forge
        .get_commits(GetCommitsRequest {
            repository_id: repository_id.to_string(),
            top: 1,
            version: Some(VersionDescriptor::branch(branch.short_name())),
        })
        .await?;

    commits
        .into_iter()
        .next()
        .map(|commit| commit.commit_id)
        .ok_or_else(|| ForgeError::NotFound(format!("no commits on branch '{}'", branch)))
}

/// Push one `kind` change for `decl` to `branch` until it lands or fails
/// terminally.
///
/// The commit message is `decl.comment`, or the default for `kind`.
///
/// # Errors
///
/// [`ResourceError::Push`] naming the repository and wrapping either the
/// terminal forge error or, on timeout, the last stale-push rejection.
pub async fn push_until_synched(
    forge: &dyn Forge,
    decl: &FileDeclaration,
    branch: &BranchRef,
    kind: ChangeKind,
    new_content: Option<&str>,
    timeouts: &Timeouts,
) -> Result<Push, ResourceError> {
    let conf = StateChangeConf {
        pending: vec![PushState::Waiting],
        target: vec![PushState::Synched],
        timeout: timeouts.push,
        min_interval: timeouts.poll_interval,
        delay: Duration::ZERO,
        continuous_target_occurrence: 1,
    };

    let mut attempt: u32 = 0;
    conf.wait_for_state(move || {
        attempt += 1;
        let attempt = attempt;
        async move {
            let tip = latest_commit_id(forge, &decl.repository_id, branch).await?;
            debug!(
                attempt,
                repository_id = %decl.repository_id,
                path = %decl.file,
                %kind,
                %tip,
                "pushing"
            );

            match forge.create_push(build_push(decl, branch, &tip, kind, new_content)).await {
                Ok(push) if push.push_id > 0 => Ok(Refresh::Observed {
                    state: PushState::Synched,
                    result: push,
                }),
                Ok(push) => Ok(Refresh::Recovered {
                    state: PushState::Waiting,
                    cause: ForgeError::ApiError {
                        status: 200,
                        message: format!("push returned invalid id {}", push.push_id),
                    },
                }),
                Err(e) if e.is_stale_ref() => {
                    warn!(
                        attempt,
                        repository_id = %decl.repository_id,
                        %branch,
                        "branch moved during push, retrying"
                    );
                    Ok(Refresh::Recovered {
                        state: PushState::Waiting,
                        cause: e,
                    })
                }
                Err(e) => Err(e),
            }
        }
    })
    .await
    .map_err(|source| ResourceError::Push {
        repository: decl.repository_id.clone(),
        path: decl.file.clone(),
        kind,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};

    fn forge() -> MockForge {
        MockForge::new()
            .with_repository("repo", "master")
            .with_file("repo", "master", "existing.txt", "old")
    }

    fn timeouts(push: Duration) -> Timeouts {
        Timeouts {
            push,
            read: Duration::from_secs(1),
            poll_interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn latest_commit_is_branch_tip() {
        let forge = forge();
        let branch = BranchRef::new("refs/heads/master").unwrap();
        let tip = latest_commit_id(&forge, "repo", &branch).await.unwrap();
        assert_eq!(Some(tip), forge.tip("repo", "master"));
    }

    #[tokio::test]
    async fn first_attempt_lands() {
        let forge = forge();
        let decl = FileDeclaration::new("repo", "new.txt", "hello");

        let push = push_until_synched(
            &forge,
            &decl,
            &BranchRef::default(),
            ChangeKind::Add,
            Some("hello"),
            &timeouts(Duration::from_secs(5)),
        )
        .await
        .unwrap();

        assert!(push.push_id > 0);
        assert_eq!(forge.push_count(), 1);
        assert_eq!(
            forge.file_content("repo", "master", "new.txt").as_deref(),
            Some("hello")
        );
        assert_eq!(
            forge.tip_comment("repo", "master").as_deref(),
            Some("Add new.txt")
        );
    }

    #[tokio::test]
    async fn stale_push_retried_with_fresh_tip() {
        let forge = forge();
        forge.race_next_pushes(1);
        let decl = FileDeclaration::new("repo", "existing.txt", "new");

        let push = push_until_synched(
            &forge,
            &decl,
            &BranchRef::default(),
            ChangeKind::Edit,
            Some("new"),
            &timeouts(Duration::from_secs(5)),
        )
        .await
        .unwrap();

        assert!(push.push_id > 0);
        let preconditions: Vec<String> = forge
            .operations()
            .into_iter()
            .filter_map(|op| match op {
                MockOperation::CreatePush { old_object_id, .. } => Some(old_object_id),
                _ => None,
            })
            .collect();
        assert_eq!(preconditions.len(), 2);
        assert_ne!(preconditions[0], preconditions[1]);
        assert_eq!(
            forge.file_content("repo", "master", "existing.txt").as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn other_push_errors_are_terminal() {
        let forge = forge().fail_on(FailOn::CreatePush(ForgeError::ApiError {
            status: 500,
            message: "Failed".into(),
        }));
        let decl = FileDeclaration::new("repo", "new.txt", "x");

        let err = push_until_synched(
            &forge,
            &decl,
            &BranchRef::default(),
            ChangeKind::Add,
            Some("x"),
            &timeouts(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert_eq!(forge.push_count(), 1);
        let message = err.to_string();
        assert!(message.contains("[repo]"), "{message}");
        assert!(message.ends_with("Failed"), "{message}");
    }

    #[tokio::test]
    async fn tip_lookup_failure_is_terminal() {
        let forge = forge().fail_on(FailOn::GetCommits(ForgeError::NetworkError(
            "connection reset".into(),
        )));
        let decl = FileDeclaration::new("repo", "new.txt", "x");

        let err = push_until_synched(
            &forge,
            &decl,
            &BranchRef::default(),
            ChangeKind::Add,
            Some("x"),
            &timeouts(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert_eq!(forge.push_count(), 0);
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn endless_races_time_out_with_last_conflict() {
        let forge = forge();
        forge.race_next_pushes(u32::MAX);
        let decl = FileDeclaration::new("repo", "new.txt", "x");

        let err = push_until_synched(
            &forge,
            &decl,
            &BranchRef::default(),
            ChangeKind::Add,
            Some("x"),
            &timeouts(Duration::from_millis(300)),
        )
        .await
        .unwrap_err();

        match &err {
            ResourceError::Push { source, .. } => {
                assert!(source.is_timeout());
                assert!(source.cause().is_some_and(ForgeError::is_stale_ref));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(forge.push_count() >= 2);
        assert!(err.to_string().contains("[repo]"));
    }
}
