//! Bounds the size of a [`Snapshot`] across repeated runs.

use std::{collections::BTreeSet, mem};

use tracing::debug;

use crate::database::{RunId, Snapshot, compute_latest};

/// The number of newest commits kept unconditionally.
pub const DEFAULT_KEEP: usize = 20;

/// Counts of what a reduction deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceSummary {
    pub commits_removed: usize,
    pub checks_removed: usize,
    pub runs_removed: usize,
}

/// Keeps the `keep` newest commits plus every older commit that still provides the latest
/// build of some artifact, and deletes the rest.
///
/// Artifacts expire, so the newest usable build of a name may be older than the `keep`
/// newest commits. Those commits survive until a newer build replaces them. Deleting a
/// commit also deletes its check suites and their workflow runs.
pub fn reduce(snapshot: &mut Snapshot, keep: usize) -> ReduceSummary {
    let mut required: BTreeSet<String> = compute_latest(snapshot)
        .into_values()
        .map(|latest| latest.commit_hash)
        .collect();

    let (kept, dropped): (Vec<_>, Vec<_>) = mem::take(&mut snapshot.commits)
        .into_iter()
        .enumerate()
        .partition(|(index, commit)| required.remove(&commit.hash) || *index < keep);
    snapshot.commits = kept.into_iter().map(|(_, commit)| commit).collect();

    let mut summary = ReduceSummary {
        commits_removed: dropped.len(),
        ..Default::default()
    };
    if dropped.is_empty() {
        return summary;
    }

    let live_checks: BTreeSet<_> = snapshot
        .commits
        .iter()
        .flat_map(|commit| commit.checks.iter().copied())
        .collect();

    let mut orphaned_runs = BTreeSet::<RunId>::new();
    for (_, commit) in &dropped {
        debug!("pruning commit {} ({})", commit.hash, commit.title);
        for check_id in &commit.checks {
            if live_checks.contains(check_id) {
                continue;
            }
            if let Some(check) = snapshot.checks.remove(check_id) {
                summary.checks_removed += 1;
                orphaned_runs.extend(check.workflow);
            }
        }
    }

    let live_runs: BTreeSet<_> = snapshot
        .checks
        .values()
        .filter_map(|check| check.workflow)
        .collect();
    for run_id in orphaned_runs.difference(&live_runs) {
        if snapshot.runs.remove(run_id).is_some() {
            summary.runs_removed += 1;
        }
    }

    debug!(
        "pruned {} commits, {} checks and {} runs",
        summary.commits_removed, summary.checks_removed, summary.runs_removed
    );
    summary
}
