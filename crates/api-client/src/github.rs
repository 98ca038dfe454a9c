//! Typed GitHub GraphQL operations.
//!
//! Each function takes any [`GraphqlTransport`] so the session layer can run
//! against the real API or a scripted stand-in.

use serde::Deserialize;
use serde_json::json;

use crate::client::GraphqlTransport;
use crate::error::{GraphqlError, Result};

pub const REPOSITORY_ID_QUERY: &str = r#"
query RepoIDQuery($repo_name: String!, $owner: String!) {
    repository(name: $repo_name, owner: $owner) {
        id
    }
}
"#;

/// Most recent branch refs, newest last.
pub const BRANCHES_QUERY: &str = r#"
query BranchQuery($repo_name: String!, $owner: String!) {
    repository(name: $repo_name, owner: $owner) {
        name
        nameWithOwner
        refs(refPrefix: "refs/heads/", last: 10) {
            totalCount
            nodes {
                id
                name
            }
        }
    }
}
"#;

pub const CREATE_PULL_REQUEST_MUTATION: &str = r#"
mutation CreatePullRequest($repo_id: ID!, $dest_branch: String!, $src_branch: String!, $title: String!, $body: String!) {
    createPullRequest(input: {repositoryId: $repo_id,
                              baseRefName: $dest_branch,
                              headRefName: $src_branch,
                              title: $title,
                              body: $body}) {
        pullRequest {
            number
            url
        }
    }
}
"#;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RepositoryData<T> {
    repository: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RepositoryId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryRefs {
    refs: RefConnection,
}

#[derive(Debug, Deserialize)]
struct RefConnection {
    nodes: Vec<BranchRef>,
}

/// A branch as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchRef {
    /// Opaque ref id.
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePullRequestData {
    create_pull_request: Option<CreatePullRequestPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePullRequestPayload {
    pull_request: PullRequest,
}

/// Input for [`create_pull_request`].
#[derive(Debug, Clone)]
pub struct NewPullRequest<'a> {
    pub repository_id: &'a str,
    /// Branch the changes merge into.
    pub base: &'a str,
    /// Branch carrying the changes.
    pub head: &'a str,
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
}

/// Fetch the opaque id of `owner/name`.
pub fn repository_id<T: GraphqlTransport + ?Sized>(
    transport: &T,
    owner: &str,
    name: &str,
) -> Result<String> {
    let body = transport.execute(
        REPOSITORY_ID_QUERY,
        json!({ "repo_name": name, "owner": owner }),
    )?;
    let envelope: Envelope<RepositoryData<RepositoryId>> = serde_json::from_value(body)?;
    envelope
        .data
        .repository
        .map(|repo| repo.id)
        .ok_or_else(|| GraphqlError::MissingData(format!("repository {owner}/{name}")))
}

/// Fetch the last 10 branches of `owner/name`.
pub fn recent_branches<T: GraphqlTransport + ?Sized>(
    transport: &T,
    owner: &str,
    name: &str,
) -> Result<Vec<BranchRef>> {
    let body = transport.execute(BRANCHES_QUERY, json!({ "owner": owner, "repo_name": name }))?;
    let envelope: Envelope<RepositoryData<RepositoryRefs>> = serde_json::from_value(body)?;
    envelope
        .data
        .repository
        .map(|repo| repo.refs.nodes)
        .ok_or_else(|| GraphqlError::MissingData(format!("repository {owner}/{name}")))
}

/// Open a pull request from `head` into `base`.
pub fn create_pull_request<T: GraphqlTransport + ?Sized>(
    transport: &T,
    request: &NewPullRequest<'_>,
) -> Result<PullRequest> {
    let body = transport.execute(
        CREATE_PULL_REQUEST_MUTATION,
        json!({
            "repo_id": request.repository_id,
            "dest_branch": request.base,
            "src_branch": request.head,
            "title": request.title,
            "body": request.body,
        }),
    )?;
    let envelope: Envelope<CreatePullRequestData> = serde_json::from_value(body)?;
    envelope
        .data
        .create_pull_request
        .map(|payload| payload.pull_request)
        .ok_or_else(|| GraphqlError::MissingData("createPullRequest".to_string()))
}
