//! Resolves the most recent build of every artifact name.

use std::collections::BTreeMap;

use crate::database::{LatestArtifactRef, Snapshot};

/// Maps every artifact name to the newest commit that has a build of it.
///
/// Commits are visited newest-first, so the first build seen for a name is the most
/// recent one. References that do not resolve are skipped.
pub fn compute_latest(snapshot: &Snapshot) -> BTreeMap<String, LatestArtifactRef> {
    let mut latest = BTreeMap::new();

    for commit in &snapshot.commits {
        for check_id in &commit.checks {
            let Some(run) = snapshot
                .checks
                .get(check_id)
                .and_then(|check| check.workflow)
                .and_then(|run_id| snapshot.runs.get(&run_id))
            else {
                continue;
            };

            for artifact in &run.artifacts {
                if latest.contains_key(&artifact.name) {
                    continue;
                }

                latest.insert(
                    artifact.name.clone(),
                    LatestArtifactRef {
                        commit_hash: commit.hash.clone(),
                        check_id: *check_id,
                        workflow_name: run.name.clone(),
                        artifact_id: artifact.id,
                        artifact_name: artifact.name.clone(),
                        artifact_size: artifact.size,
                    },
                );
            }
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{fixtures::*, merge, merge_artifacts};

    use pretty_assertions::assert_eq;

    #[test]
    fn newest_build_wins_per_name() {
        let mut snapshot = Snapshot::new();
        merge(
            &mut snapshot,
            &[
                commit("c3", vec![suite(13, "IN_PROGRESS", Some((23, "Linux")))]),
                commit(
                    "c2",
                    vec![
                        suite(12, "COMPLETED", Some((22, "Linux"))),
                        suite(15, "COMPLETED", Some((25, "Windows"))),
                    ],
                ),
                commit("c1", vec![suite(11, "COMPLETED", Some((21, "Linux")))]),
            ],
        )
        .unwrap();
        merge_artifacts(&mut snapshot, 21, &[artifact(31, "linux-editor", 10)]).unwrap();
        merge_artifacts(&mut snapshot, 22, &[artifact(32, "linux-editor", 20)]).unwrap();
        merge_artifacts(&mut snapshot, 25, &[artifact(35, "windows-editor", 50)]).unwrap();

        let latest = compute_latest(&snapshot);

        assert_eq!(latest.len(), 2);
        assert_eq!(
            latest["linux-editor"],
            LatestArtifactRef {
                commit_hash: "c2".to_owned(),
                check_id: 12,
                workflow_name: "Linux".to_owned(),
                artifact_id: 32,
                artifact_name: "linux-editor".to_owned(),
                artifact_size: 20,
            }
        );
        assert_eq!(latest["windows-editor"].check_id, 15);
        assert_eq!(latest["windows-editor"].commit_hash, "c2");
    }

    #[test]
    fn repeated_calls_agree() {
        let mut snapshot = Snapshot::new();
        merge(
            &mut snapshot,
            &[commit("c1", vec![suite(11, "COMPLETED", Some((21, "Linux")))])],
        )
        .unwrap();
        merge_artifacts(&mut snapshot, 21, &[artifact(31, "editor.zip", 100)]).unwrap();

        assert_eq!(compute_latest(&snapshot), compute_latest(&snapshot));
    }

    #[test]
    fn dangling_references_are_skipped() {
        let mut snapshot = Snapshot::new();
        merge(
            &mut snapshot,
            &[commit("c1", vec![suite(11, "COMPLETED", Some((21, "Linux")))])],
        )
        .unwrap();
        merge_artifacts(&mut snapshot, 21, &[artifact(31, "editor.zip", 100)]).unwrap();
        snapshot.runs.clear();

        assert!(compute_latest(&snapshot).is_empty());
    }
}
