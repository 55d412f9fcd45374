//! Transactions against the GitHub API.
//!
//! Every transaction returns a [`StateResult`](crate::framework::StateResult) so it can be
//! looped by [`run_with_retry`](crate::framework::run_with_retry).

#![cfg(feature = "remote")]

mod check_rate_limit;
mod fetch_artifacts;
mod fetch_commits;

pub use check_rate_limit::*;
pub use fetch_artifacts::*;
pub use fetch_commits::*;

use reqwest::{Method, RequestBuilder, Response, StatusCode, header};
use serde::{Deserialize, de::DeserializeOwned};
use std::error::Error as _;
use tracing::{error, trace, warn};

use crate::{env::GITHUB_TOKEN, framework::StateError, static_lazy_lock};

/// The GitHub GraphQL API endpoint.
pub const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// The GitHub REST API root.
pub const REST_URL: &str = "https://api.github.com";

static_lazy_lock! {
    HTTP_CLIENT: reqwest::Client = reqwest::Client::new();
}

/// Builds a request for GitHub API, authenticated if a token is configured.
pub fn github_api_request_builder(method: Method, url: &str) -> RequestBuilder {
    let builder = HTTP_CLIENT
        .request(method, url)
        .header(header::ACCEPT, "application/vnd.github+json")
        .header("X-GitHub-Api-Version", "2022-11-28")
        .header(
            header::USER_AGENT,
            concat!("build-status-db/", env!("CARGO_PKG_VERSION")),
        );

    match GITHUB_TOKEN.as_deref() {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// A GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: String,
}

/// Sends a GraphQL query with its variables and returns its `data`.
async fn graphql<T>(what: &str, query: &str, variables: serde_json::Value) -> Result<T, StateError>
where
    T: DeserializeOwned,
{
    if GITHUB_TOKEN.is_none() {
        warn!("no GRAPHQL_TOKEN or GITHUB_TOKEN set, the GraphQL API will likely refuse {what}");
    }

    let body = serde_json::json!({ "query": query, "variables": variables });
    let response = send(
        what,
        github_api_request_builder(Method::POST, GRAPHQL_URL).json(&body),
    )
    .await?;

    let envelope = parse::<GraphQlResponse<T>>(what, response).await?;
    if !envelope.errors.is_empty() {
        warn!("server handled {what}, but there were errors:");
        for err in &envelope.errors {
            warn!("[{}] {}", err.kind.as_deref().unwrap_or("ERROR"), err.message);
        }
    }

    envelope.data.ok_or_else(|| {
        error!("no data returned for {what}");
        StateError::Cancelled
    })
}

/// Sends a request and classifies failures into retrying or cancelling.
async fn send(what: &str, request: RequestBuilder) -> Result<Response, StateError> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            error!("failed to request {what}: {err}");
            return match err {
                _ if err.is_connect() || err.is_timeout() => Err(StateError::Retry),
                _ => Err(StateError::Cancelled),
            };
        }
    };

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.canonical_reason() {
        Some(reason) => error!("failed to request {what}: {} {reason}", status.as_u16()),
        None => error!("failed to request {what}: {}", status.as_u16()),
    }
    if let Some(retry_after) = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
    {
        warn!("retry after: {retry_after}");
    }

    if retryable(status) {
        Err(StateError::Retry)
    } else {
        Err(StateError::Cancelled)
    }
}

/// Server errors and rate limiting are transient; anything else will fail again.
fn retryable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::FORBIDDEN
}

async fn parse<T>(what: &str, response: Response) -> Result<T, StateError>
where
    T: DeserializeOwned,
{
    match response.text().await {
        Ok(body) => decode(what, &body),
        Err(err) => {
            error!("failed to read {what}: {err}");

            if let Some(source) = err.source() {
                error!("{source}")
            }

            Err(StateError::Retry)
        }
    }
}

/// Decodes a response body. The raw body is logged at `trace` level.
fn decode<T>(what: &str, body: &str) -> Result<T, StateError>
where
    T: DeserializeOwned,
{
    trace!("raw response for {what}: {body}");

    serde_json::from_str(body).map_err(|err| {
        error!("failed to parse {what}: {err}");
        StateError::Retry
    })
}
