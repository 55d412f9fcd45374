//! Commits and check suites from the GitHub GraphQL API.

use serde::Deserialize;

use crate::{
    database::{CheckId, RunId, WorkflowId},
    error::ParseError,
    workflow::Connection,
};

/// A commit of the branch history, with its check suites.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawCommit {
    pub oid: Option<String>,
    pub committed_date: Option<String>,
    pub message_headline: Option<String>,
    pub check_suites: Option<Connection<RawCheckSuite>>,
}

/// A check suite attached to a commit.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawCheckSuite {
    pub database_id: Option<CheckId>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub workflow_run: Option<RawWorkflowRun>,
}

/// The workflow run a check suite resolved to.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawWorkflowRun {
    pub database_id: Option<RunId>,
    pub workflow: Option<RawWorkflow>,
}

/// The workflow a run belongs to.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawWorkflow {
    pub database_id: Option<WorkflowId>,
    pub name: Option<String>,
}

/// A validated view of a [`RawCommit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord<'a> {
    pub hash: &'a str,
    pub title: &'a str,
    pub committed_date: &'a str,
    pub checks: Vec<CheckRecord<'a>>,
}

/// A validated view of a [`RawCheckSuite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRecord<'a> {
    pub check_id: CheckId,
    pub check_url: &'a str,
    pub status: &'a str,
    pub conclusion: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
    pub run: Option<RunRecord<'a>>,
}

/// A validated view of a [`RawWorkflowRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRecord<'a> {
    pub run_id: RunId,
    pub workflow_id: WorkflowId,
    pub name: &'a str,
}

impl RawCommit {
    /// Validates the commit and all of its check suites.
    ///
    /// `index` is the position of the commit in its batch and only serves error reporting.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] naming the first required field that is missing.
    pub fn validate(&self, index: usize) -> Result<CommitRecord<'_>, ParseError> {
        let missing = |field| ParseError::MissingCommitField { index, field };

        let hash = self.oid.as_deref().ok_or_else(|| missing("oid"))?;
        let title = self
            .message_headline
            .as_deref()
            .ok_or_else(|| missing("messageHeadline"))?;
        let committed_date = self
            .committed_date
            .as_deref()
            .ok_or_else(|| missing("committedDate"))?;

        let checks = match &self.check_suites {
            Some(suites) => suites
                .nodes()
                .enumerate()
                .map(|(index, suite)| suite.validate(hash, index))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(CommitRecord {
            hash,
            title,
            committed_date,
            checks,
        })
    }
}

impl RawCheckSuite {
    fn validate(&self, hash: &str, index: usize) -> Result<CheckRecord<'_>, ParseError> {
        let missing = |field| ParseError::MissingCheckField {
            hash: hash.to_owned(),
            index,
            field,
        };

        let check_id = self.database_id.ok_or_else(|| missing("databaseId"))?;
        let run = self
            .workflow_run
            .as_ref()
            .map(|run| run.validate(check_id))
            .transpose()?;

        Ok(CheckRecord {
            check_id,
            check_url: self.url.as_deref().ok_or_else(|| missing("url"))?,
            status: self.status.as_deref().ok_or_else(|| missing("status"))?,
            conclusion: self.conclusion.as_deref(),
            created_at: self
                .created_at
                .as_deref()
                .ok_or_else(|| missing("createdAt"))?,
            updated_at: self
                .updated_at
                .as_deref()
                .ok_or_else(|| missing("updatedAt"))?,
            run,
        })
    }
}

impl RawWorkflowRun {
    fn validate(&self, check_id: CheckId) -> Result<RunRecord<'_>, ParseError> {
        let missing = |field| ParseError::MissingRunField { check_id, field };

        let workflow = self.workflow.as_ref().ok_or_else(|| missing("workflow"))?;
        Ok(RunRecord {
            run_id: self.database_id.ok_or_else(|| missing("databaseId"))?,
            workflow_id: workflow
                .database_id
                .ok_or_else(|| missing("workflow.databaseId"))?,
            name: workflow
                .name
                .as_deref()
                .ok_or_else(|| missing("workflow.name"))?,
        })
    }
}
