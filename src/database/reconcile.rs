//! Merges freshly fetched remote data into a [`Snapshot`].

use std::collections::btree_map::Entry;

use tracing::debug;

use crate::{
    database::{Check, Commit, Run, RunId, Snapshot},
    error::ParseError,
    workflow::{CheckRecord, CommitRecord, RawArtifact, RawCommit},
};

/// Counts of what a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub commits_added: usize,
    pub checks_added: usize,
    pub checks_updated: usize,
    pub runs_added: usize,
}

/// Merges a batch of commits, fetched newest-first, into the snapshot.
///
/// Commits are applied oldest to newest, so a commit the snapshot has not seen yet lands
/// ahead of every older commit of the same batch. Known commits keep their position.
/// Known check suites only take the new `status`, `conclusion` and `updated_at`; a
/// workflow run is attached to a check suite once and never replaced.
///
/// # Errors
///
/// Returns a [`ParseError`] for the first malformed commit. Commits applied before it
/// stay merged.
pub fn merge(
    snapshot: &mut Snapshot,
    raw_commits: &[RawCommit],
) -> Result<MergeSummary, ParseError> {
    let mut summary = MergeSummary::default();
    // Position of the previously applied commit, which is older than the current one.
    let mut anchor: Option<usize> = None;

    for (index, raw) in raw_commits.iter().enumerate().rev() {
        let record = raw.validate(index)?;

        let position = match snapshot.commit_position(record.hash) {
            Some(position) => position,
            None => {
                let position =
                    anchor.unwrap_or_else(|| insertion_point(snapshot, &raw_commits[..index]));
                snapshot.commits.insert(position, skeleton(&record));
                summary.commits_added += 1;
                position
            }
        };
        anchor = Some(position);

        for check in &record.checks {
            upsert_check(snapshot, position, check, &mut summary);
        }
    }

    if raw_commits.is_empty() {
        debug!("nothing to merge");
    } else {
        debug!(
            "merged {} commits: {} new commits, {} new checks, {} updated checks, {} new runs",
            raw_commits.len(),
            summary.commits_added,
            summary.checks_added,
            summary.checks_updated,
            summary.runs_added,
        );
    }

    Ok(summary)
}

/// Where the oldest new commit of a batch goes: right behind the nearest newer commit of
/// the batch that is already stored, or at the head.
fn insertion_point(snapshot: &Snapshot, newer: &[RawCommit]) -> usize {
    newer
        .iter()
        .rev()
        .filter_map(|raw| raw.oid.as_deref())
        .find_map(|hash| snapshot.commit_position(hash))
        .map_or(0, |position| position + 1)
}

fn skeleton(record: &CommitRecord<'_>) -> Commit {
    Commit {
        hash: record.hash.to_owned(),
        title: record.title.to_owned(),
        committed_date: record.committed_date.to_owned(),
        checks: Vec::new(),
    }
}

fn upsert_check(
    snapshot: &mut Snapshot,
    position: usize,
    record: &CheckRecord<'_>,
    summary: &mut MergeSummary,
) {
    let check = match snapshot.checks.entry(record.check_id) {
        Entry::Occupied(entry) => {
            let check = entry.into_mut();
            check.status = record.status.to_owned();
            check.conclusion = record.conclusion.map(str::to_owned);
            check.updated_at = record.updated_at.to_owned();
            summary.checks_updated += 1;
            check
        }
        Entry::Vacant(entry) => {
            summary.checks_added += 1;
            entry.insert(Check {
                check_id: record.check_id,
                check_url: record.check_url.to_owned(),
                status: record.status.to_owned(),
                conclusion: record.conclusion.map(str::to_owned),
                created_at: record.created_at.to_owned(),
                updated_at: record.updated_at.to_owned(),
                workflow: None,
            })
        }
    };

    if let (None, Some(run)) = (check.workflow, &record.run) {
        check.workflow = Some(run.run_id);
        if let Entry::Vacant(entry) = snapshot.runs.entry(run.run_id) {
            debug!("discovered run {} ({})", run.run_id, run.name);
            entry.insert(Run {
                name: run.name.to_owned(),
                workflow_id: run.workflow_id,
                run_id: run.run_id,
                artifacts: Vec::new(),
                empty_polls: 0,
            });
            summary.runs_added += 1;
        }
    }

    let commit = &mut snapshot.commits[position];
    if !commit.checks.contains(&record.check_id) {
        commit.checks.push(record.check_id);
    }
}

/// Appends the listed artifacts to a known run and returns how many were new.
///
/// Artifacts already recorded under the same id are skipped, so listing a run twice
/// does not duplicate its artifacts. Artifacts flagged as expired are not recorded.
///
/// # Errors
///
/// Returns [`ParseError::UnknownRun`] if the run is not in the snapshot, or a
/// [`ParseError`] for the first malformed artifact. Artifacts appended before it stay.
pub fn merge_artifacts(
    snapshot: &mut Snapshot,
    run_id: RunId,
    raw_artifacts: &[RawArtifact],
) -> Result<usize, ParseError> {
    let run = snapshot
        .runs
        .get_mut(&run_id)
        .ok_or(ParseError::UnknownRun(run_id))?;

    let mut added = 0;
    for (index, raw) in raw_artifacts.iter().enumerate() {
        let artifact = raw.to_artifact(run_id, index)?;

        if raw.expired {
            debug!("skipping expired artifact {raw} of run {run_id}");
        } else if run.artifacts.iter().any(|known| known.id == artifact.id) {
            debug!("artifact {raw} of run {run_id} is already known");
        } else {
            run.artifacts.push(artifact);
            added += 1;
        }
    }

    Ok(added)
}
