use std::fmt::Display;

use tracing::{error, info, warn};

use crate::env::{API_DELAY, MAX_RETRIES};

/// An error that controls the flow of a transaction.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// The transaction should be retried if possible.
    ///
    /// See: [`retry_if_possible`]
    Retry,
    /// The transaction should stop immediately.
    Cancelled,
}

impl Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retry => write!(f, "retry requested"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for StateError {}

/// The result of a transaction.
pub type StateResult<T> = Result<T, StateError>;

/// Decides whether retrying is allowed based on a provided retry times and the [`MAX_RETRIES`] environment variable.
///
/// # Errors
///
/// Returns [`Err<()>`] if retrying is not allowed, otherwise [`Ok<()>`] is returned.
pub fn retry_if_possible(retry: &mut u8) -> Result<(), ()> {
    *retry = retry.saturating_add(1);
    if *retry > *MAX_RETRIES {
        error!("retried for too many times ({}), stopping!", *MAX_RETRIES);
        Err(())
    } else {
        warn!("retrying… ({retry} / {})", *MAX_RETRIES);
        Ok(())
    }
}

/// Runs a transaction until it returns a value, is cancelled, or runs out of retries.
///
/// Waits [`API_DELAY`] between two attempts.
///
/// # Errors
///
/// Returns [`StateError::Cancelled`] if the transaction was cancelled or retried too many times.
pub async fn run_with_retry<T, F, Fut>(name: &str, mut transaction: F) -> StateResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StateResult<T>>,
{
    info!("starting transaction {name}…");
    let mut retry: u8 = 0;

    loop {
        match transaction().await {
            Ok(value) => {
                info!("transaction {name} succeed!");
                return Ok(value);
            }
            Err(StateError::Retry) => match retry_if_possible(&mut retry) {
                Ok(()) => tokio::time::sleep(*API_DELAY).await,
                Err(()) => {
                    error!("transaction {name} failed!");
                    return Err(StateError::Cancelled);
                }
            },
            Err(StateError::Cancelled) => {
                error!("transaction {name} failed!");
                return Err(StateError::Cancelled);
            }
        }
    }
}
