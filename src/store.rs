//! Loads and saves the [`Snapshot`] of a branch as a JSON document.

#![cfg(feature = "store")]

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{database::Snapshot, error::StoreError};

/// The JSON document holding the snapshot of one (owner, repo, branch).
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Locates the document under `<out_dir>/data/<owner>.<repo>.<branch>.json`.
    ///
    /// Characters that are not valid in a file name, like the `/` of `feature/x`, are replaced with `_`.
    pub fn new<P>(out_dir: P, owner: &str, repo: &str, branch: &str) -> Self
    where
        P: AsRef<Path>,
    {
        let file_name = sanitize_filename::sanitize_with_options(
            format!("{owner}.{repo}.{branch}.json"),
            sanitize_filename::Options {
                replacement: "_",
                ..Default::default()
            },
        );

        Self {
            path: out_dir.as_ref().join("data").join(file_name),
        }
    }

    /// The location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot, starting over with an empty one if it cannot be read.
    pub async fn load(&self) -> Snapshot {
        match self.try_load().await {
            Ok(snapshot) => {
                info!(
                    "loaded {} commits, {} checks and {} runs from {:?}",
                    snapshot.commits.len(),
                    snapshot.checks.len(),
                    snapshot.runs.len(),
                    self.path
                );
                snapshot
            }
            Err(StoreError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                info!("no existing database at {:?}, starting empty", self.path);
                Snapshot::new()
            }
            Err(err) => {
                warn!("failed to load existing database, starting empty: {err}");
                Snapshot::new()
            }
        }
    }

    /// Loads the snapshot and checks its references.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the document cannot be read, parsed, or is inconsistent.
    pub async fn try_load(&self) -> Result<Snapshot, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
        snapshot.verify()?;
        Ok(snapshot)
    }

    /// Saves the snapshot.
    ///
    /// The document is written next to the target first and then renamed over it, so a
    /// failed save leaves the previous document intact.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the document cannot be serialized or written.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(snapshot).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let staging = self.path.with_extension("json.tmp");
        debug!("writing {} bytes to {staging:?}…", bytes.len());
        if let Err(source) = tokio::fs::write(&staging, &bytes).await {
            drop(tokio::fs::remove_file(&staging).await);
            return Err(StoreError::Io {
                path: staging,
                source,
            });
        }
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        info!("stored database to {:?}", self.path);
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{fixtures::*, merge, merge_artifacts};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new();
        merge(
            &mut snapshot,
            &[
                commit("c2", vec![suite(12, "QUEUED", None)]),
                commit("c1", vec![suite(11, "COMPLETED", Some((21, "Linux")))]),
            ],
        )
        .unwrap();
        merge_artifacts(&mut snapshot, 21, &[artifact(31, "editor.zip", 100)]).unwrap();
        snapshot.refresh_latest();
        snapshot.generated_at = 1_709_290_800_000;
        snapshot
    }

    #[test]
    fn branch_names_become_file_names() {
        let store = SnapshotStore::new("out", "godotengine", "godot", "feature/gdextension");
        assert_eq!(
            store.path(),
            Path::new("out/data/godotengine.godot.feature_gdextension.json")
        );
    }

    #[tokio::test]
    async fn saved_snapshot_loads_back() {
        let dir = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(dir.path(), "o", "r", "master");
        let snapshot = sample();

        store.save(&snapshot).await.unwrap();

        assert_eq!(store.try_load().await.unwrap(), snapshot);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_document_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(dir.path(), "o", "r", "master");

        assert!(matches!(store.try_load().await, Err(StoreError::Io { .. })));
        assert_eq!(store.load().await, Snapshot::new());
    }

    #[tokio::test]
    async fn corrupted_document_loads_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(dir.path(), "o", "r", "master");
        tokio::fs::create_dir_all(store.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(store.path(), b"{\"commits\": [").await.unwrap();

        assert!(matches!(store.try_load().await, Err(StoreError::Json { .. })));
        assert_eq!(store.load().await, Snapshot::new());
    }

    #[tokio::test]
    async fn inconsistent_document_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(dir.path(), "o", "r", "master");
        let mut snapshot = sample();
        snapshot.runs.clear();
        store.save(&snapshot).await.unwrap();

        assert!(matches!(
            store.try_load().await,
            Err(StoreError::Integrity(_))
        ));
    }
}
