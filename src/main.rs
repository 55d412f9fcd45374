//! Builds the local workflow run database of a branch.
//!
//! Exit codes: 1 when a request failed, 2 when remote data could not be parsed, 3 when the
//! invocation is invalid, 4 when the database could not be stored.

use std::{path::PathBuf, process::ExitCode};

use build_status_db::{
    database::DEFAULT_KEEP,
    env::MAX_ARTIFACT_POLLS,
    pipeline::{BuildConfig, build_database},
    transactions::DEFAULT_WINDOW,
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "build-status-db")]
#[command(about = "Builds a local database of CI workflow runs and artifacts", version)]
struct Cli {
    /// Owner of the repository
    #[arg(long, default_value = "godotengine")]
    owner: String,

    /// Name of the repository
    #[arg(long, default_value = "godot")]
    repo: String,

    /// Branch to track
    #[arg(long)]
    branch: String,

    /// Output directory; the database is stored under `<out-dir>/data/`
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Number of newest commits always kept
    #[arg(long, default_value_t = DEFAULT_KEEP)]
    keep: usize,

    /// Number of commits fetched per run
    #[arg(long, default_value_t = DEFAULT_WINDOW, value_parser = clap::value_parser!(u8).range(1..=100))]
    window: u8,
}

impl From<Cli> for BuildConfig {
    fn from(cli: Cli) -> Self {
        Self {
            owner: cli.owner,
            repo: cli.repo,
            branch: cli.branch,
            out_dir: cli.out_dir,
            keep: cli.keep,
            window: cli.window,
            max_artifact_polls: *MAX_ARTIFACT_POLLS,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BuildConfig::from(Cli::parse());
    info!("building local workflow run database");

    match build_database(&config).await {
        Ok(report) => {
            info!(
                "database built: {} new commits, {} new runs, {} new artifacts, {} pruned commits, {} latest artifacts",
                report.commits_added,
                report.runs_added,
                report.artifacts_added,
                report.commits_removed,
                report.latest_artifacts
            );
            if report.runs_failed > 0 {
                warn!("artifacts of {} runs could not be listed", report.runs_failed);
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            error!("{failure}");
            error!("terminating with an exit code {}", failure.exit_code());
            ExitCode::from(failure.exit_code())
        }
    }
}
