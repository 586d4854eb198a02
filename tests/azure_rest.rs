//! Azure DevOps REST adapter against a local HTTP mock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use repofile::core::types::BranchRef;
use repofile::engine::WaitError;
use repofile::forge::azure::AzureDevOpsForge;
use repofile::forge::{
    ChangeKind, Forge, ForgeError, GetCommitsRequest, GetItemRequest, GitChange, PushRequest,
    RefUpdate, VersionDescriptor,
};
use repofile::resource::read::read_file;
use repofile::resource::{FileDeclaration, RepositoryFileResource, Timeouts};

const REPO: &str = "/_apis/git/repositories/repo";

fn forge(server: &MockServer) -> AzureDevOpsForge {
    AzureDevOpsForge::new(server.uri(), None, "pat")
}

fn push_request(old: &str) -> PushRequest {
    PushRequest {
        repository_id: "repo".into(),
        ref_update: RefUpdate {
            name: "refs/heads/main".into(),
            old_object_id: old.into(),
        },
        comment: "Add a.txt".into(),
        change: GitChange::with_text(ChangeKind::Add, "a.txt", "hello"),
    }
}

fn stale_response() -> ResponseTemplate {
    ResponseTemplate::new(409).set_body_json(json!({
        "$id": "1",
        "message": "TF401028: The reference 'refs/heads/main' has already been updated by another client, so you cannot update it. Please try again.",
        "typeKey": "GitReferenceStaleException"
    }))
}

mod requests {
    use super::*;

    #[tokio::test]
    async fn get_branch_sends_auth_and_api_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{REPO}/stats/branches")))
            .and(query_param("name", "main"))
            .and(query_param("api-version", "6.0"))
            .and(header("authorization", "Basic OnBhdA=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "main",
                "commit": { "commitId": "abc123" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stats = forge(&server).get_branch("repo", "main").await.unwrap();

        assert_eq!(stats.name, "main");
        assert_eq!(stats.commit_id, "abc123");
    }

    #[tokio::test]
    async fn get_item_selects_branch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{REPO}/items")))
            .and(query_param("path", "docs/a.md"))
            .and(query_param("includeContent", "true"))
            .and(query_param("versionDescriptor.version", "feature"))
            .and(query_param("versionDescriptor.versionType", "branch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "path": "/docs/a.md",
                "commitId": "c1",
                "content": "body"
            })))
            .mount(&server)
            .await;

        let item = forge(&server)
            .get_item(GetItemRequest {
                repository_id: "repo".into(),
                path: "docs/a.md".into(),
                version: Some(VersionDescriptor::branch("feature")),
                include_content: true,
            })
            .await
            .unwrap();

        assert_eq!(item.commit_id, "c1");
        assert_eq!(item.content.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn get_commits_top() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{REPO}/commits")))
            .and(query_param("$top", "1"))
            .and(query_param("searchCriteria.itemVersion.version", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "value": [{ "commitId": "tip", "comment": "Latest" }]
            })))
            .mount(&server)
            .await;

        let commits = forge(&server)
            .get_commits(GetCommitsRequest {
                repository_id: "repo".into(),
                top: 1,
                version: Some(VersionDescriptor::branch("main")),
            })
            .await
            .unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].commit_id, "tip");
        assert_eq!(commits[0].comment.as_deref(), Some("Latest"));
    }

    #[tokio::test]
    async fn push_body_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{REPO}/pushes")))
            .and(body_partial_json(json!({
                "refUpdates": [{ "name": "refs/heads/main", "oldObjectId": "old" }],
                "commits": [{
                    "comment": "Add a.txt",
                    "changes": [{
                        "changeType": "add",
                        "item": { "path": "a.txt" },
                        "newContent": { "content": "hello", "contentType": "rawText" }
                    }]
                }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "pushId": 42,
                "commits": [{ "commitId": "new" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let push = forge(&server).create_push(push_request("old")).await.unwrap();

        assert_eq!(push.push_id, 42);
        assert_eq!(push.commit_id.as_deref(), Some("new"));
    }
}

mod errors {
    use super::*;

    #[tokio::test]
    async fn stale_push() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{REPO}/pushes")))
            .respond_with(stale_response())
            .mount(&server)
            .await;

        let err = forge(&server).create_push(push_request("old")).await.unwrap_err();

        assert!(err.is_stale_ref(), "{err}");
        assert!(matches!(err, ForgeError::ApiError { status: 409, .. }));
    }

    #[tokio::test]
    async fn not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{REPO}/commits/missing")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "TF401175: The commit missing was not found."
            })))
            .mount(&server)
            .await;

        let err = forge(&server).get_commit("repo", "missing").await.unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("TF401175"));
    }

    #[tokio::test]
    async fn unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = forge(&server).get_branch("repo", "main").await.unwrap_err();

        assert!(matches!(err, ForgeError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = forge(&server).get_branch("repo", "main").await.unwrap_err();

        assert!(matches!(err, ForgeError::RateLimited));
    }

    #[tokio::test]
    async fn empty_token_never_sends() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let forge = AzureDevOpsForge::new(server.uri(), None, "");
        let err = forge.get_branch("repo", "main").await.unwrap_err();

        assert!(matches!(err, ForgeError::AuthRequired));
    }

    #[tokio::test]
    async fn item_without_content_is_not_read_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{REPO}/items")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "path": "/a.txt",
                "commitId": "c1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{REPO}/commits/c1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "commitId": "c1",
                "comment": "Add a.txt"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let err = read_file(
            &forge(&server),
            "repo",
            "a.txt",
            &BranchRef::default(),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(&err, WaitError::Refresh(ForgeError::ApiError { message, .. }) if message.contains("without its content")),
            "{err}"
        );
    }
}

#[tokio::test]
async fn create_retries_stale_push_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{REPO}/stats/branches")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "master",
            "commit": { "commitId": "tip" }
        })))
        .mount(&server)
        .await;
    // Existence probe runs before any push; the read-back runs after.
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/items")))
        .and(query_param("includeContent", "false"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "TF401174: The item 'a.txt' could not be found."
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/items")))
        .and(query_param("includeContent", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": "/a.txt",
            "commitId": "new",
            "content": "hello"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/commits")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "commitId": "tip" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO}/commits/new")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "commitId": "new",
            "comment": "Add a.txt"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/pushes")))
        .respond_with(stale_response())
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{REPO}/pushes")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "pushId": 7 })))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let resource = RepositoryFileResource::new(Arc::new(forge(&server))).with_timeouts(Timeouts {
        push: Duration::from_secs(10),
        read: Duration::from_secs(2),
        poll_interval: Duration::from_millis(10),
    });
    let mut decl = FileDeclaration::new("repo", "a.txt", "hello");

    resource.create(&mut decl).await.unwrap();

    assert_eq!(decl.id.as_ref().unwrap().to_string(), "repo/a.txt");
    assert_eq!(decl.content, "hello");
    assert_eq!(decl.comment.as_deref(), Some("Add a.txt"));
}
