use reqwest::Method;
use tracing::{debug, info};

use crate::{
    database::RunId,
    framework::StateResult,
    transactions::{REST_URL, github_api_request_builder, parse, send},
    workflow::{Artifacts, RawArtifact},
};

/// Fetches the artifacts of a workflow run from GitHub.
///
/// An empty listing is not an error: the run may still be in progress, or may never
/// upload anything.
///
/// # Errors
///
/// Returns an error that instructs retrying or cancelling if fetching the artifacts fails.
pub async fn fetch_artifacts(
    owner: &str,
    repo: &str,
    run_id: RunId,
) -> StateResult<Vec<RawArtifact>> {
    let url =
        format!("{REST_URL}/repos/{owner}/{repo}/actions/runs/{run_id}/artifacts?per_page=100");
    debug!("fetching artifacts from {url}…");

    let what = format!("artifacts of run {run_id}");
    let response = send(&what, github_api_request_builder(Method::GET, &url)).await?;
    let artifacts = parse::<Artifacts>(&what, response).await?;

    match artifacts.artifacts.len() {
        1 => info!("[$0] retrieved 1 artifact for run {run_id}"),
        count => info!("[$0] retrieved {count} artifacts for run {run_id}"),
    }
    if usize::try_from(artifacts.total_count)
        .is_ok_and(|total| total > artifacts.artifacts.len())
    {
        info!(
            "run {run_id} lists {} artifacts, only the first {} were retrieved",
            artifacts.total_count,
            artifacts.artifacts.len()
        );
    }

    Ok(artifacts.artifacts)
}
