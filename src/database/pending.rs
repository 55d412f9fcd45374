//! Finds the workflow runs whose artifacts are still unknown.

use crate::database::{RunId, Snapshot};

/// Lists the runs without any recorded artifact, in ascending id order.
///
/// A run that will never produce an artifact is indistinguishable from a pending one
/// here. See [`runs_to_poll`] for the bounded variant.
pub fn incomplete_runs(snapshot: &Snapshot) -> Vec<RunId> {
    snapshot
        .runs
        .iter()
        .filter(|(_, run)| run.artifacts.is_empty())
        .map(|(run_id, _)| *run_id)
        .collect()
}

/// Lists the incomplete runs that have come back empty fewer than `max_polls` times.
pub fn runs_to_poll(snapshot: &Snapshot, max_polls: u32) -> Vec<RunId> {
    incomplete_runs(snapshot)
        .into_iter()
        .filter(|run_id| {
            snapshot
                .runs
                .get(run_id)
                .is_some_and(|run| run.empty_polls < max_polls)
        })
        .collect()
}

/// Records that an artifact listing of the run came back empty.
///
/// Only counts once the check suite owning the run has completed, since a run that is
/// still in progress has not uploaded its artifacts yet. Returns whether the poll was
/// counted.
pub fn record_empty_poll(snapshot: &mut Snapshot, run_id: RunId) -> bool {
    let completed = snapshot
        .check_for_run(run_id)
        .is_some_and(|check| check.is_completed());

    match snapshot.runs.get_mut(&run_id) {
        Some(run) if completed && run.artifacts.is_empty() => {
            run.empty_polls = run.empty_polls.saturating_add(1);
            true
        }
        _ => false,
    }
}

/// Records that the artifact listing of the run could not be fetched at all.
///
/// Counts regardless of the check suite status: a run deleted upstream stays
/// unreachable. Returns whether the run is known.
pub fn record_failed_poll(snapshot: &mut Snapshot, run_id: RunId) -> bool {
    match snapshot.runs.get_mut(&run_id) {
        Some(run) => {
            run.empty_polls = run.empty_polls.saturating_add(1);
            true
        }
        None => false,
    }
}
