use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{GraphqlError, Result};

/// Anything that can run a GraphQL document and hand back the decoded body.
///
/// Implementations must run [`check_response`] (or equivalent) so callers
/// only ever see payloads that carry `data` and no `errors`.
pub trait GraphqlTransport: Send + Sync {
    fn execute(&self, query: &str, variables: Value) -> Result<Value>;
}

impl<T: GraphqlTransport + ?Sized> GraphqlTransport for Box<T> {
    fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        (**self).execute(query, variables)
    }
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

/// Blocking GraphQL client authenticated with a personal access token.
///
/// One POST per call. No retries, rate limiting or caching.
pub struct GraphqlClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"***")
            .finish()
    }
}

impl GraphqlClient {
    /// Create a new client for `endpoint`. `timeout` bounds the whole request.
    pub fn new(endpoint: &str, token: &str, timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GraphqlError::Http(e.to_string()))?;
        Ok(Self::with_client(client, endpoint, token))
    }

    /// Create from an existing `reqwest::blocking::Client`.
    pub fn with_client(client: reqwest::blocking::Client, endpoint: &str, token: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl GraphqlTransport for GraphqlClient {
    fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        debug!(endpoint = %self.endpoint, "POST graphql");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .json(&GraphqlRequest { query, variables })
            .send()
            .map_err(|e| GraphqlError::Http(e.without_url().to_string()))?;
        parse_response(resp)
    }
}

/// Turn an HTTP response into a checked GraphQL body.
fn parse_response(resp: reqwest::blocking::Response) -> Result<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(GraphqlError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let body: Value = resp
        .json()
        .map_err(|e| GraphqlError::Decode(e.to_string()))?;
    check_response(body)
}

/// Reject bodies that report errors or carry no `data`.
///
/// GitHub reports most failures in a top-level `errors` array; some proxies
/// nest it under `data`. Both are treated as API errors.
pub fn check_response(body: Value) -> Result<Value> {
    if let Some(errors) = body.get("errors").filter(|e| has_errors(e)) {
        return Err(GraphqlError::Api {
            payload: errors.to_string(),
        });
    }
    let data = match body.get("data") {
        Some(data) if !data.is_null() => data,
        _ => return Err(GraphqlError::MissingData(body.to_string())),
    };
    if let Some(errors) = data.get("errors").filter(|e| has_errors(e)) {
        return Err(GraphqlError::Api {
            payload: errors.to_string(),
        });
    }
    Ok(body)
}

fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
