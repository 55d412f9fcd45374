//! End-to-end behavior of a database across merges, artifact polling and pruning.

use std::collections::BTreeSet;

use build_status_db::{
    database::{
        DEFAULT_KEEP, LatestArtifactRef, MergeSummary, Snapshot, compute_latest, incomplete_runs,
        merge, merge_artifacts, reduce,
    },
    workflow::{RawArtifact, RawCommit},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn suite(check_id: u64, run: Option<(u64, &str)>) -> Value {
    json!({
        "databaseId": check_id,
        "url": format!("https://github.com/godotengine/godot/runs/{check_id}"),
        "status": "COMPLETED",
        "conclusion": "SUCCESS",
        "createdAt": "2024-03-01T10:00:00Z",
        "updatedAt": "2024-03-01T10:30:00Z",
        "workflowRun": run.map(|(run_id, name)| json!({
            "databaseId": run_id,
            "workflow": { "databaseId": 7, "name": name }
        })),
    })
}

fn commit(hash: &str, suites: Vec<Value>) -> RawCommit {
    serde_json::from_value(json!({
        "oid": hash,
        "committedDate": "2024-03-01T09:00:00Z",
        "messageHeadline": format!("Commit {hash}"),
        "checkSuites": {
            "edges": suites.into_iter().map(|node| json!({ "node": node })).collect::<Vec<_>>()
        },
    }))
    .unwrap()
}

fn artifact(id: u64, name: &str, size: u64) -> RawArtifact {
    RawArtifact {
        id: Some(id),
        name: Some(name.to_owned()),
        size_in_bytes: Some(size),
        created_at: Some("2024-03-01T10:25:00Z".to_owned()),
        updated_at: Some("2024-03-01T10:25:00Z".to_owned()),
        expires_at: Some("2024-05-30T10:25:00Z".to_owned()),
        ..Default::default()
    }
}

fn hashes(snapshot: &Snapshot) -> Vec<String> {
    snapshot.commits.iter().map(|c| c.hash.clone()).collect()
}

/// Commits `c{count}` (newest) down to `c1`; commit `cN` has check `100 + N` and run `200 + N`.
fn history(count: u64) -> Vec<RawCommit> {
    (1..=count)
        .rev()
        .map(|n| {
            commit(
                &format!("c{n}"),
                vec![suite(100 + n, Some((200 + n, "Linux Builds")))],
            )
        })
        .collect()
}

fn assert_invariants(snapshot: &Snapshot) {
    let unique: BTreeSet<_> = snapshot.commits.iter().map(|c| &c.hash).collect();
    assert_eq!(unique.len(), snapshot.commits.len(), "duplicate commit hashes");
    assert_eq!(snapshot.verify(), Ok(()));
}

#[test]
fn scenario_first_merge_without_workflow() {
    let mut snapshot = Snapshot::new();

    merge(&mut snapshot, &[commit("c1", vec![suite(1, None)])]).unwrap();
    snapshot.refresh_latest();

    assert_eq!(hashes(&snapshot), vec!["c1"]);
    assert_eq!(snapshot.commits[0].checks, vec![1]);
    assert_eq!(snapshot.checks[&1].workflow, None);
    assert!(snapshot.runs.is_empty());
    assert!(snapshot.latest.is_empty());
    assert_invariants(&snapshot);
}

#[test]
fn scenario_remerge_attaches_workflow() {
    let mut snapshot = Snapshot::new();
    merge(&mut snapshot, &[commit("c1", vec![suite(1, None)])]).unwrap();

    merge(&mut snapshot, &[commit("c1", vec![suite(1, Some((5, "Linux Builds")))])]).unwrap();

    assert_eq!(hashes(&snapshot), vec!["c1"]);
    assert_eq!(snapshot.commits[0].checks, vec![1]);
    assert_eq!(snapshot.checks[&1].workflow, Some(5));
    assert!(snapshot.runs[&5].artifacts.is_empty());
    assert_eq!(incomplete_runs(&snapshot), vec![5]);
    assert_invariants(&snapshot);
}

#[test]
fn scenario_artifacts_resolve_latest() {
    let mut snapshot = Snapshot::new();
    merge(&mut snapshot, &[commit("c1", vec![suite(1, None)])]).unwrap();
    merge(&mut snapshot, &[commit("c1", vec![suite(1, Some((5, "Linux Builds")))])]).unwrap();

    merge_artifacts(&mut snapshot, 5, &[artifact(9, "editor.zip", 100)]).unwrap();

    assert_eq!(
        snapshot.runs[&5].artifacts.iter().map(|a| a.id).collect::<Vec<_>>(),
        vec![9]
    );
    let latest = compute_latest(&snapshot);
    assert_eq!(latest.len(), 1);
    assert_eq!(
        latest["editor.zip"],
        LatestArtifactRef {
            commit_hash: "c1".to_owned(),
            check_id: 1,
            workflow_name: "Linux Builds".to_owned(),
            artifact_id: 9,
            artifact_name: "editor.zip".to_owned(),
            artifact_size: 100,
        }
    );
    assert!(incomplete_runs(&snapshot).is_empty());
}

#[test]
fn scenario_retention_keeps_oldest_provider() {
    let mut snapshot = Snapshot::new();
    merge(&mut snapshot, &history(25)).unwrap();
    merge_artifacts(&mut snapshot, 201, &[artifact(9, "editor.zip", 100)]).unwrap();
    let latest = compute_latest(&snapshot);
    assert_eq!(latest["editor.zip"].commit_hash, "c1");

    let summary = reduce(&mut snapshot, 20);

    let mut expected: Vec<String> = (6..=25).rev().map(|n| format!("c{n}")).collect();
    expected.push("c1".to_owned());
    assert_eq!(hashes(&snapshot), expected);
    assert_eq!(summary.commits_removed, 4);
    assert_eq!(summary.checks_removed, 4);
    assert_eq!(summary.runs_removed, 4);
    assert_eq!(compute_latest(&snapshot), latest);
    assert_invariants(&snapshot);
}

#[test]
fn empty_batch_is_a_no_op() {
    let mut snapshot = Snapshot::new();
    merge(&mut snapshot, &history(3)).unwrap();
    let before = snapshot.clone();

    let summary = merge(&mut snapshot, &[]).unwrap();

    assert_eq!(summary, MergeSummary::default());
    assert_eq!(snapshot, before);
}

#[test]
fn repeated_batches_never_duplicate_commits() {
    let mut snapshot = Snapshot::new();
    let batch = history(12);

    // Sliding windows of ten commits, oldest first, as repeated runs would fetch them.
    for end in (10..=12).rev() {
        let start = end - 10;
        merge(&mut snapshot, &batch[start..end]).unwrap();
        assert_invariants(&snapshot);
    }
    merge(&mut snapshot, &batch).unwrap();

    let expected: Vec<String> = (1..=12).rev().map(|n| format!("c{n}")).collect();
    assert_eq!(hashes(&snapshot), expected);
    assert_invariants(&snapshot);
}

#[test]
fn reduce_respects_lower_bound_and_latest() {
    for (count, keep) in [(3, 5), (5, 5), (30, 5), (30, 0), (40, DEFAULT_KEEP)] {
        let mut snapshot = Snapshot::new();
        merge(&mut snapshot, &history(count)).unwrap();
        // Builds on every fourth commit, alternating between two artifact names.
        for n in (1..=count).filter(|n| n % 4 == 0) {
            let name = if n % 8 == 0 { "editor.zip" } else { "templates.tpz" };
            merge_artifacts(&mut snapshot, 200 + n, &[artifact(n, name, n * 10)]).unwrap();
        }
        let latest = compute_latest(&snapshot);
        let total = snapshot.commits.len();

        reduce(&mut snapshot, keep);

        assert!(snapshot.commits.len() >= keep.min(total));
        for entry in latest.values() {
            assert!(snapshot.commit(&entry.commit_hash).is_some());
        }
        assert_eq!(compute_latest(&snapshot), latest);
        assert_invariants(&snapshot);
    }
}

#[test]
fn persisted_document_round_trips() {
    let mut snapshot = Snapshot::new();
    merge(&mut snapshot, &history(4)).unwrap();
    merge_artifacts(&mut snapshot, 203, &[artifact(9, "editor.zip", 100)]).unwrap();
    snapshot.refresh_latest();
    snapshot.generated_at = 1_709_290_800_000;

    let document = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(document["generated_at"], json!(1_709_290_800_000_i64));
    assert_eq!(document["commits"][0]["hash"], json!("c4"));
    assert_eq!(document["checks"]["103"]["workflow"], json!(203));
    assert_eq!(document["runs"]["203"]["artifacts"][0]["size"], json!(100));
    assert_eq!(
        document["latest"]["editor.zip"],
        json!({
            "commit_hash": "c3",
            "check_id": 103,
            "workflow_name": "Linux Builds",
            "artifact_id": 9,
            "artifact_name": "editor.zip",
            "artifact_size": 100,
        })
    );

    let loaded: Snapshot = serde_json::from_value(document.clone()).unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(serde_json::to_value(&loaded).unwrap(), document);
}
