//! Error kinds reported by the database builder.
//!
//! The core operations never abort the process. They return these values and the
//! orchestrator decides whether to continue, and which exit code to use.

use std::{io, path::PathBuf};

use crate::database::{CheckId, RunId};

/// A raw payload from the remote source is missing data or references unknown records.
///
/// Items merged before the malformed entry stay in the snapshot.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A commit entry lacks a required field.
    #[error("commit entry #{index} is missing `{field}`")]
    MissingCommitField {
        /// Position of the entry in the fetched batch.
        index: usize,
        /// The missing field.
        field: &'static str,
    },
    /// A check suite entry lacks a required field.
    #[error("check suite #{index} of commit {hash} is missing `{field}`")]
    MissingCheckField {
        /// The commit owning the check suite.
        hash: String,
        /// Position of the check suite in the commit.
        index: usize,
        /// The missing field.
        field: &'static str,
    },
    /// A workflow run association lacks a required field.
    #[error("workflow run of check suite {check_id} is missing `{field}`")]
    MissingRunField {
        /// The check suite carrying the association.
        check_id: CheckId,
        /// The missing field.
        field: &'static str,
    },
    /// An artifact entry lacks a required field.
    #[error("artifact #{index} of run {run_id} is missing `{field}`")]
    MissingArtifactField {
        /// The run the artifact was listed for.
        run_id: RunId,
        /// Position of the artifact in the listing.
        index: usize,
        /// The missing field.
        field: &'static str,
    },
    /// Artifacts were supplied for a run the snapshot does not know.
    #[error("run {0} is not part of the database")]
    UnknownRun(RunId),
}

/// A snapshot violates one of its referential invariants.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Two commits share a hash.
    #[error("commit {0} is listed more than once")]
    DuplicateCommit(String),
    /// A commit references a check suite that is not stored.
    #[error("commit {hash} references unknown check suite {check_id}")]
    DanglingCheck {
        /// The referencing commit.
        hash: String,
        /// The missing check suite.
        check_id: CheckId,
    },
    /// A check suite references a workflow run that is not stored.
    #[error("check suite {check_id} references unknown run {run_id}")]
    DanglingRun {
        /// The referencing check suite.
        check_id: CheckId,
        /// The missing run.
        run_id: RunId,
    },
}

/// Reading or writing the persisted snapshot failed.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file system refused the operation.
    #[error("i/o error at {path:?}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// The file does not hold a valid snapshot document.
    #[error("invalid snapshot document at {path:?}: {source}")]
    Json {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The document parsed but its references are inconsistent.
    #[error("inconsistent snapshot: {0}")]
    Integrity(#[from] IntegrityError),
}

/// The outcome of a failed batch, as seen by the process.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// Fetching data from the remote source failed.
    #[error("request failed: {0}")]
    Request(String),
    /// The remote source returned malformed data.
    #[error("failed to parse remote data: {0}")]
    Parse(#[from] ParseError),
    /// The process was invoked with unusable arguments.
    #[error("invalid invocation: {0}")]
    Exec(String),
    /// The snapshot could not be persisted.
    #[error("failed to store the database: {0}")]
    Io(#[from] StoreError),
}

impl Failure {
    /// The process exit code for this failure.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Request(_) => 1,
            Self::Parse(_) => 2,
            Self::Exec(_) => 3,
            Self::Io(_) => 4,
        }
    }
}
