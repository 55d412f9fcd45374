//! The batch job: load, fetch, merge, prune, resolve, save.

#![cfg(all(feature = "remote", feature = "store"))]

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    database::{self, DEFAULT_KEEP, RunId, Snapshot},
    env::{API_DELAY, MAX_ARTIFACT_POLLS},
    error::Failure,
    framework::{StateResult, run_with_retry},
    store::SnapshotStore,
    transactions::{DEFAULT_WINDOW, check_rate_limit, fetch_artifacts, fetch_commits},
    workflow::RawArtifact,
};

/// What to build the database for.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Root of the output tree; the document goes to `<out_dir>/data/`.
    pub out_dir: PathBuf,
    /// Newest commits always kept by the retention policy.
    pub keep: usize,
    /// Commits fetched per run.
    pub window: u8,
    /// Empty listings a completed run gets before it stops being polled.
    pub max_artifact_polls: u32,
}

impl BuildConfig {
    /// A configuration with default retention, window and polling limits.
    pub fn new(owner: &str, repo: &str, branch: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
            branch: branch.to_owned(),
            out_dir: PathBuf::from("out"),
            keep: DEFAULT_KEEP,
            window: DEFAULT_WINDOW,
            max_artifact_polls: *MAX_ARTIFACT_POLLS,
        }
    }

    /// Checks that the repository and branch are named.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Exec`] if the owner, the repository or the branch is empty.
    pub fn validate(&self) -> Result<(), Failure> {
        if self.owner.is_empty() || self.repo.is_empty() || self.branch.is_empty() {
            return Err(Failure::Exec(
                "owner, repo, and branch cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Counts of what a build changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub commits_added: usize,
    pub checks_added: usize,
    pub checks_updated: usize,
    pub runs_added: usize,
    pub runs_polled: usize,
    /// Runs whose artifact listing could not be fetched.
    pub runs_failed: usize,
    /// Incomplete runs left out because they reached the polling limit.
    pub runs_skipped: usize,
    pub artifacts_added: usize,
    pub commits_removed: usize,
    pub latest_artifacts: usize,
}

/// Updates the persisted database of a branch with the latest data from GitHub.
///
/// Nothing is written if fetching the commits, parsing remote data or saving fails, so
/// such a build leaves the previous document untouched. A run whose artifacts cannot be
/// listed is skipped until the next build.
///
/// # Errors
///
/// Returns a [`Failure`] describing the first step that failed.
pub async fn build_database(config: &BuildConfig) -> Result<BuildReport, Failure> {
    config.validate()?;
    info!(
        "configured for the {}/{} repository; branch {}",
        config.owner, config.repo, config.branch
    );

    let store = SnapshotStore::new(&config.out_dir, &config.owner, &config.repo, &config.branch);
    let mut snapshot = store.load().await;

    info!("checking the rate limits before");
    log_rate_limit().await;

    info!("fetching workflow runs data from GitHub");
    let raw_commits = run_with_retry("fetch commits", || {
        fetch_commits(&config.owner, &config.repo, &config.branch, config.window)
    })
    .await
    .map_err(|err| Failure::Request(format!("fetching commits of {}: {err}", config.branch)))?;
    let merged = database::merge(&mut snapshot, &raw_commits)?;

    let mut report = BuildReport {
        commits_added: merged.commits_added,
        checks_added: merged.checks_added,
        checks_updated: merged.checks_updated,
        runs_added: merged.runs_added,
        ..Default::default()
    };

    info!("fetching artifact data from GitHub");
    poll_artifacts(config, &mut snapshot, &mut report).await?;

    info!("finalizing database");
    report.commits_removed = database::reduce(&mut snapshot, config.keep).commits_removed;
    snapshot.refresh_latest();
    snapshot.generated_at = chrono::Utc::now().timestamp_millis();
    report.latest_artifacts = snapshot.latest.len();

    info!("checking the rate limits after");
    log_rate_limit().await;

    store.save(&snapshot).await?;
    Ok(report)
}

async fn poll_artifacts(
    config: &BuildConfig,
    snapshot: &mut Snapshot,
    report: &mut BuildReport,
) -> Result<(), Failure> {
    let pending = pending_runs(snapshot, config.max_artifact_polls, report);

    for (index, run_id) in pending.into_iter().enumerate() {
        // Keeps clear of the secondary rate limit of the GitHub API.
        if index > 0 {
            tokio::time::sleep(*API_DELAY).await;
        }

        let listing = run_with_retry("fetch artifacts", || {
            fetch_artifacts(&config.owner, &config.repo, run_id)
        })
        .await;
        apply_listing(snapshot, run_id, listing, config.max_artifact_polls, report)?;
    }

    Ok(())
}

/// Picks the runs to poll and counts the incomplete ones that reached the polling limit.
fn pending_runs(snapshot: &Snapshot, max_polls: u32, report: &mut BuildReport) -> Vec<RunId> {
    let pending = database::runs_to_poll(snapshot, max_polls);
    report.runs_skipped = database::incomplete_runs(snapshot)
        .len()
        .saturating_sub(pending.len());
    if report.runs_skipped > 0 {
        debug!(
            "{} runs reached the polling limit and are no longer polled",
            report.runs_skipped
        );
    }
    pending
}

/// Applies the outcome of listing the artifacts of one run.
///
/// A listing that could not be fetched counts against the polling limit of the run and
/// the batch moves on to the next run.
///
/// # Errors
///
/// Returns [`Failure::Parse`] if the listing is malformed.
fn apply_listing(
    snapshot: &mut Snapshot,
    run_id: RunId,
    listing: StateResult<Vec<RawArtifact>>,
    max_polls: u32,
    report: &mut BuildReport,
) -> Result<(), Failure> {
    let raw_artifacts = match listing {
        Ok(raw_artifacts) => raw_artifacts,
        Err(err) => {
            warn!("skipping the artifacts of run {run_id}: {err}");
            report.runs_failed += 1;
            database::record_failed_poll(snapshot, run_id);
            return Ok(());
        }
    };
    report.runs_polled += 1;

    let added = database::merge_artifacts(snapshot, run_id, &raw_artifacts)?;
    report.artifacts_added += added;
    if added == 0 && database::record_empty_poll(snapshot, run_id) {
        if let Some(run) = snapshot.runs.get(&run_id) {
            debug!(
                "run {run_id} finished without artifacts ({} / {max_polls})",
                run.empty_polls
            );
        }
    }

    Ok(())
}

async fn log_rate_limit() {
    if let Err(err) = check_rate_limit().await {
        warn!("failed to check the API rate limits: {err}");
    }
}
