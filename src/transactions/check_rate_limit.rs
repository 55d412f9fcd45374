use serde::Deserialize;
use tracing::info;

use crate::{
    framework::{StateError, StateResult},
    transactions::graphql,
    workflow::RateLimit,
};

const RATE_LIMIT_QUERY: &str = r"
query {
    rateLimit {
        limit
        cost
        nodeCount
        remaining
        resetAt
    }
}
";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitData {
    rate_limit: Option<RateLimit>,
}

/// Fetches and logs the GraphQL API rate limit.
///
/// # Errors
///
/// Returns an error that instructs retrying or cancelling if the request fails.
pub async fn check_rate_limit() -> StateResult<RateLimit> {
    let data: RateLimitData =
        graphql("the rate limit", RATE_LIMIT_QUERY, serde_json::json!({})).await?;

    let rate_limit = data.rate_limit.ok_or(StateError::Cancelled)?;
    info!("{rate_limit}");
    Ok(rate_limit)
}
