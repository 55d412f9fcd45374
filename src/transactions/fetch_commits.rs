use serde::Deserialize;
use tracing::{debug, error, info};

use crate::{
    framework::{StateError, StateResult},
    transactions::graphql,
    workflow::{Connection, RateLimit, RawCommit},
};

/// The number of commits fetched per batch unless configured otherwise.
pub const DEFAULT_WINDOW: u8 = 10;

const COMMITS_QUERY: &str = r"
query ($owner: String!, $name: String!, $branch: String!, $window: Int!) {
    rateLimit {
        limit
        cost
        nodeCount
        remaining
        resetAt
    }

    repository(owner: $owner, name: $name) {
        object(expression: $branch) {
            ... on Commit {
                history(first: $window) {
                    edges {
                        node {
                            ...CommitData
                        }
                    }
                }
            }
        }
    }
}

fragment CommitData on Commit {
    oid
    committedDate
    messageHeadline

    checkSuites(first: 20) {
        edges {
            node {
                ...CheckSuiteData
            }
        }
    }
}

fragment CheckSuiteData on CheckSuite {
    databaseId
    url
    status
    conclusion
    createdAt
    updatedAt
    workflowRun {
        databaseId
        workflow {
            databaseId
            name
        }
    }
}
";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryData {
    rate_limit: Option<RateLimit>,
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    object: Option<CommitNode>,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    history: Option<Connection<RawCommit>>,
}

/// Fetches the newest `window` commits of a branch with their check suites, newest first.
///
/// # Errors
///
/// Returns an error that instructs retrying or cancelling if the request fails, or the
/// repository or branch cannot be resolved.
pub async fn fetch_commits(
    owner: &str,
    repo: &str,
    branch: &str,
    window: u8,
) -> StateResult<Vec<RawCommit>> {
    let what = format!("commits of {owner}/{repo}@{branch}");
    debug!("fetching {window} {what}…");

    let variables = serde_json::json!({
        "owner": owner,
        "name": repo,
        "branch": branch,
        "window": window,
    });
    let data: HistoryData = graphql(&what, COMMITS_QUERY, variables).await?;

    let Some(repository) = data.repository else {
        error!("repository {owner}/{repo} not found");
        return Err(StateError::Cancelled);
    };
    let Some(history) = repository.object.and_then(|object| object.history) else {
        error!("branch {branch} does not resolve to a commit in {owner}/{repo}");
        return Err(StateError::Cancelled);
    };

    let commits = history.into_nodes();
    match &data.rate_limit {
        Some(rate_limit) => info!(
            "[${}][{}] retrieved {} commits and their runs",
            rate_limit.cost,
            rate_limit.node_count,
            commits.len()
        ),
        None => info!("retrieved {} commits and their runs", commits.len()),
    }

    Ok(commits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_history_response() {
        let data: HistoryData = serde_json::from_value(serde_json::json!({
            "rateLimit": {
                "limit": 5000, "cost": 1, "nodeCount": 210, "remaining": 4999,
                "resetAt": "2024-03-01T11:00:00Z"
            },
            "repository": { "object": { "history": { "edges": [
                { "node": { "oid": "c2", "committedDate": "t2", "messageHeadline": "m2",
                            "checkSuites": { "edges": [] } } },
                { "node": { "oid": "c1", "committedDate": "t1", "messageHeadline": "m1",
                            "checkSuites": { "edges": [] } } }
            ] } } }
        }))
        .unwrap();

        let commits = data.repository.unwrap().object.unwrap().history.unwrap().into_nodes();
        let hashes: Vec<_> = commits.iter().filter_map(|c| c.oid.as_deref()).collect();
        assert_eq!(hashes, vec!["c2", "c1"]);
    }

    #[test]
    fn missing_branch_parses_as_empty_object() {
        let data: HistoryData = serde_json::from_value(serde_json::json!({
            "rateLimit": null,
            "repository": { "object": null }
        }))
        .unwrap();

        assert!(data.repository.unwrap().object.is_none());
    }
}
