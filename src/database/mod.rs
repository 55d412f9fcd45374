//! The workflow run database of a single branch.
//!
//! A [`Snapshot`] is loaded once, mutated in memory by the operations of this module, and
//! persisted once at the end of a batch.
//!
//! See: [`merge`], [`merge_artifacts`], [`reduce`], [`compute_latest`], [`incomplete_runs`]

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::IntegrityError;

pub mod latest;
pub mod pending;
pub mod reconcile;
pub mod retention;

pub use latest::compute_latest;
pub use pending::{incomplete_runs, record_empty_poll, record_failed_poll, runs_to_poll};
pub use reconcile::{MergeSummary, merge, merge_artifacts};
pub use retention::{DEFAULT_KEEP, ReduceSummary, reduce};

/// The database id of a check suite.
pub type CheckId = u64;
/// The database id of a workflow run.
pub type RunId = u64;
/// The database id of a workflow.
pub type WorkflowId = u64;
/// The id of an artifact.
pub type ArtifactId = u64;

/// A commit of the tracked branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub title: String,
    pub committed_date: String,
    /// Check suites of this commit, in discovery order and without repetition.
    pub checks: Vec<CheckId>,
}

/// A check suite of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub check_id: CheckId,
    pub check_url: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// The workflow run this check suite resolved to. Never changes once set.
    pub workflow: Option<RunId>,
}

impl Check {
    /// Whether the check suite finished, regardless of its conclusion.
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }
}

/// A workflow run and the artifacts it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub name: String,
    pub workflow_id: WorkflowId,
    pub run_id: RunId,
    pub artifacts: Vec<Artifact>,
    /// Artifact listings that came back empty after the run completed.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub empty_polls: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// A build output of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub name: String,
    pub size: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub expires_at: Option<String>,
}

/// The most recent build of an artifact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestArtifactRef {
    pub commit_hash: String,
    pub check_id: CheckId,
    pub workflow_name: String,
    pub artifact_id: ArtifactId,
    pub artifact_name: String,
    pub artifact_size: u64,
}

/// The persisted database of a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Generation time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub generated_at: i64,
    /// Commits, newest first.
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub checks: BTreeMap<CheckId, Check>,
    #[serde(default)]
    pub runs: BTreeMap<RunId, Run>,
    /// Derived from the other fields, see [`Snapshot::refresh_latest`].
    #[serde(default)]
    pub latest: BTreeMap<String, LatestArtifactRef>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a commit by its hash.
    pub fn commit(&self, hash: &str) -> Option<&Commit> {
        self.commits.iter().find(|commit| commit.hash == hash)
    }

    /// Finds the position of a commit in the newest-first list.
    pub fn commit_position(&self, hash: &str) -> Option<usize> {
        self.commits.iter().position(|commit| commit.hash == hash)
    }

    /// Finds the check suite that resolved to the given run.
    pub fn check_for_run(&self, run_id: RunId) -> Option<&Check> {
        self.checks
            .values()
            .find(|check| check.workflow == Some(run_id))
    }

    /// Recomputes [`Snapshot::latest`] from commits, checks and runs.
    pub fn refresh_latest(&mut self) {
        self.latest = compute_latest(self);
    }

    /// Checks that commits are unique and every reference resolves.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn verify(&self) -> Result<(), IntegrityError> {
        let mut hashes = BTreeSet::new();
        for commit in &self.commits {
            if !hashes.insert(commit.hash.as_str()) {
                return Err(IntegrityError::DuplicateCommit(commit.hash.clone()));
            }

            if let Some(check_id) = commit
                .checks
                .iter()
                .copied()
                .find(|check_id| !self.checks.contains_key(check_id))
            {
                return Err(IntegrityError::DanglingCheck {
                    hash: commit.hash.clone(),
                    check_id,
                });
            }
        }

        for check in self.checks.values() {
            match check.workflow {
                Some(run_id) if !self.runs.contains_key(&run_id) => {
                    return Err(IntegrityError::DanglingRun {
                        check_id: check.check_id,
                        run_id,
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}
