//! forge::azure
//!
//! Azure DevOps forge implementation over the Git REST API.
//!
//! # Design
//!
//! Each [`Forge`] method maps to one REST call under
//! `<org>[/<project>]/_apis/git/repositories/<repository>`, pinned to
//! API version 6.0. Authentication is HTTP basic auth with an empty user name
//! and a personal access token as the password.
//!
//! # Error Mapping
//!
//! | Status | Error |
//! |---|---|
//! | 401, 403 | `AuthFailed` |
//! | 404 | `NotFound` |
//! | 429 | `RateLimited` |
//! | other non-2xx | `ApiError` with the service's `message` |
//!
//! A push rejected because the branch moved comes back as an `ApiError`
//! whose message contains [`STALE_REF_MESSAGE`](super::STALE_REF_MESSAGE).
//!
//! # Example
//!
//! ```ignore
//! use repofile::forge::azure::AzureDevOpsForge;
//! use repofile::forge::Forge;
//!
//! let forge = AzureDevOpsForge::new("https://dev.azure.com/myorg", Some("infra"), token);
//! let tip = forge.get_branch("config-repo", "main").await?.commit_id;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    BranchStats, ChangeKind, Commit, ContentType, Forge, ForgeError, GetCommitsRequest,
    GetItemRequest, GitItem, Push, PushRequest,
};

/// REST API version every request is pinned to.
pub const API_VERSION: &str = "6.0";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "repofile";

/// Azure DevOps forge implementation.
pub struct AzureDevOpsForge {
    /// HTTP client for making requests
    client: Client,
    /// Personal access token
    token: String,
    /// Organization URL, e.g. `https://dev.azure.com/myorg`
    org_service_url: String,
    /// Optional project segment
    project: Option<String>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for AzureDevOpsForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDevOpsForge")
            .field("has_token", &!self.token.is_empty())
            .field("org_service_url", &self.org_service_url)
            .field("project", &self.project)
            .finish()
    }
}

impl AzureDevOpsForge {
    /// Create a forge for an organization (or on-premises collection) URL.
    ///
    /// `org_service_url` doubles as the API base, so tests can point it at a
    /// local HTTP server.
    pub fn new(
        org_service_url: impl Into<String>,
        project: Option<&str>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            org_service_url: org_service_url.into().trim_end_matches('/').to_string(),
            project: project.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    /// The organization URL requests are sent to.
    pub fn org_service_url(&self) -> &str {
        &self.org_service_url
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repository_id: &str, path: &str) -> String {
        match &self.project {
            Some(project) => format!(
                "{}/{}/_apis/git/repositories/{}/{}",
                self.org_service_url, project, repository_id, path
            ),
            None => format!(
                "{}/_apis/git/repositories/{}/{}",
                self.org_service_url, repository_id, path
            ),
        }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers
    }

    /// Attach auth, headers and the API version, then send.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }
        request
            .headers(Self::headers())
            .basic_auth("", Some(&self.token))
            .query(&[("api-version", API_VERSION)])
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(self.handle_error_response(response, status).await)
        }
    }

    /// Map an error response to a [`ForgeError`].
    async fn handle_error_response(&self, response: Response, status: StatusCode) -> ForgeError {
        // Azure DevOps reports errors as {"$id": "1", "message": "...", "typeKey": "..."}
        let message = match response.json::<AzureErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => {
                ForgeError::AuthFailed("Invalid or expired personal access token".into())
            }
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl Forge for AzureDevOpsForge {
    fn name(&self) -> &'static str {
        "azuredevops"
    }

    async fn get_branch(
        &self,
        repository_id: &str,
        name: &str,
    ) -> Result<BranchStats, ForgeError> {
        let url = self.repo_url(repository_id, "stats/branches");
        debug!(repository_id, name, "get branch");

        let response = self
            .send(self.client.get(&url).query(&[("name", name)]))
            .await?;
        let stats: AzureBranchStats = self.handle_response(response).await?;

        Ok(BranchStats {
            name: stats.name,
            commit_id: stats.commit.commit_id,
        })
    }

    async fn get_item(&self, request: GetItemRequest) -> Result<GitItem, ForgeError> {
        let url = self.repo_url(&request.repository_id, "items");
        debug!(
            repository_id = %request.repository_id,
            path = %request.path,
            include_content = request.include_content,
            "get item"
        );

        let mut query = vec![
            ("path", request.path.clone()),
            ("includeContent", request.include_content.to_string()),
        ];
        if let Some(version) = &request.version {
            query.push(("versionDescriptor.version", version.branch.clone()));
            query.push(("versionDescriptor.versionType", "branch".to_string()));
        }

        let response = self.send(self.client.get(&url).query(&query)).await?;
        let item: AzureGitItem = self.handle_response(response).await?;

        Ok(GitItem {
            path: item.path,
            commit_id: item.commit_id,
            content: item.content,
        })
    }

    async fn get_commit(&self, repository_id: &str, commit_id: &str) -> Result<Commit, ForgeError> {
        let url = self.repo_url(repository_id, &format!("commits/{}", commit_id));
        debug!(repository_id, commit_id, "get commit");

        let response = self.send(self.client.get(&url)).await?;
        let commit: AzureCommitRef = self.handle_response(response).await?;

        Ok(commit.into())
    }

    async fn get_commits(&self, request: GetCommitsRequest) -> Result<Vec<Commit>, ForgeError> {
        let url = self.repo_url(&request.repository_id, "commits");
        debug!(repository_id = %request.repository_id, top = request.top, "get commits");

        let mut query = vec![("$top", request.top.to_string())];
        if let Some(version) = &request.version {
            query.push(("searchCriteria.itemVersion.version", version.branch.clone()));
        }

        let response = self.send(self.client.get(&url).query(&query)).await?;
        let commits: AzureList<AzureCommitRef> = self.handle_response(response).await?;

        Ok(commits.value.into_iter().map(Commit::from).collect())
    }

    async fn create_push(&self, request: PushRequest) -> Result<Push, ForgeError> {
        let url = self.repo_url(&request.repository_id, "pushes");
        debug!(
            repository_id = %request.repository_id,
            ref_name = %request.ref_update.name,
            old_object_id = %request.ref_update.old_object_id,
            kind = %request.change.kind,
            path = %request.change.path,
            "create push"
        );

        let body = CreatePushBody::from(&request);
        let response = self.send(self.client.post(&url).json(&body)).await?;
        let push: AzurePush = self.handle_response(response).await?;

        Ok(Push {
            push_id: push.push_id,
            commit_id: push
                .commits
                .and_then(|commits| commits.into_iter().next())
                .map(|c| c.commit_id),
        })
    }
}

// Azure DevOps API types

#[derive(Deserialize)]
struct AzureErrorResponse {
    message: String,
}

#[derive(Deserialize)]
struct AzureList<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureBranchStats {
    name: String,
    commit: AzureCommitRef,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureCommitRef {
    commit_id: String,
    #[serde(default)]
    comment: Option<String>,
}

impl From<AzureCommitRef> for Commit {
    fn from(commit: AzureCommitRef) -> Self {
        Commit {
            commit_id: commit.commit_id,
            comment: commit.comment,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureGitItem {
    path: String,
    commit_id: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzurePush {
    push_id: i64,
    #[serde(default)]
    commits: Option<Vec<AzureCommitRef>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePushBody<'a> {
    ref_updates: [RefUpdateBody<'a>; 1],
    commits: [CommitBody<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefUpdateBody<'a> {
    name: &'a str,
    old_object_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitBody<'a> {
    comment: &'a str,
    changes: [ChangeBody<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeBody<'a> {
    change_type: ChangeKind,
    item: ItemPathBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_content: Option<NewContentBody<'a>>,
}

#[derive(Serialize)]
struct ItemPathBody<'a> {
    path: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewContentBody<'a> {
    content: &'a str,
    content_type: ContentType,
}

impl<'a> From<&'a PushRequest> for CreatePushBody<'a> {
    fn from(request: &'a PushRequest) -> Self {
        CreatePushBody {
            ref_updates: [RefUpdateBody {
                name: &request.ref_update.name,
                old_object_id: &request.ref_update.old_object_id,
            }],
            commits: [CommitBody {
                comment: &request.comment,
                changes: [ChangeBody {
                    change_type: request.change.kind,
                    item: ItemPathBody {
                        path: &request.change.path,
                    },
                    new_content: request.change.new_content.as_ref().map(|c| NewContentBody {
                        content: &c.content,
                        content_type: c.content_type,
                    }),
                }],
            }],
        }
    }
}
