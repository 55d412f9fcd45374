//! Defines the environment variables to use.

#![cfg(feature = "env")]

use crate::static_lazy_lock;

use std::{env, time::Duration};

/// Parses an environment variable from [`String`] to something else, wrapping any error in [`anyhow::Error`].
#[macro_export]
macro_rules! parse_env {
    ($key:expr => |$var:ident| $expr:expr) => {
        std::env::var($key)
            .map_err(|e| anyhow::anyhow!(e))
            .and_then(|$var| $expr)
    };
    ($key:expr => |$var:ident| $expr:expr; anyhow) => {
        $crate::parse_env!($key => |$var| $expr.map_err(|e| anyhow::anyhow!(e)))
    };
}

pub use parse_env;

#[cfg(feature = "env_github_token")]
static_lazy_lock! {
    /// The token for GitHub API requests, taken from `GRAPHQL_TOKEN` or `GITHUB_TOKEN`.
    pub GITHUB_TOKEN: Option<String> = env::var("GRAPHQL_TOKEN")
        .or_else(|_| env::var("GITHUB_TOKEN"))
        .ok()
        .filter(|token| !token.is_empty());
}

#[cfg(feature = "env_max_retries")]
static_lazy_lock! {
    /// The maximum retry limit for transactions.
    pub MAX_RETRIES: u8 = parse_env!("MAX_RETRIES" => |s| s.parse::<u8>(); anyhow).unwrap_or(5);
}

static_lazy_lock! {
    /// The pause between two requests to the GitHub API.
    pub API_DELAY: Duration = Duration::from_millis(
        parse_env!("API_DELAY_MS" => |s| s.parse::<u64>(); anyhow).unwrap_or(1500)
    );
}

static_lazy_lock! {
    /// How many empty artifact listings a completed run gets before it stops being polled.
    pub MAX_ARTIFACT_POLLS: u32 =
        parse_env!("MAX_ARTIFACT_POLLS" => |s| s.parse::<u32>(); anyhow).unwrap_or(5);
}
