//! Raw data models of GitHub commits, check suites and workflow runs.
//!
//! Every field the remote source may omit is optional here. Validation into
//! the `*Record` views turns missing data into a [`ParseError`](crate::error::ParseError)
//! before anything reaches the database.

use std::fmt::Display;

use serde::Deserialize;

pub mod artifact;
pub mod commit;

pub use artifact::*;
pub use commit::*;

/// A GraphQL connection, flattened through its `edges`.
#[derive(Debug, Deserialize, Clone)]
pub struct Connection<T> {
    #[serde(default)]
    pub edges: Vec<Edge<T>>,
}

/// A single GraphQL edge.
#[derive(Debug, Deserialize, Clone)]
pub struct Edge<T> {
    pub node: T,
}

impl<T> Connection<T> {
    /// Unwraps the nodes, keeping their order.
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|edge| edge.node).collect()
    }

    /// Iterates over the nodes, keeping their order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// The GraphQL API rate limit status.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub limit: u32,
    pub cost: u32,
    pub node_count: u32,
    pub remaining: u32,
    pub reset_at: String,
}

impl Display for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[${}][{}] available API calls: {}/{}; resets at {}",
            self.cost, self.node_count, self.remaining, self.limit, self.reset_at
        )
    }
}
