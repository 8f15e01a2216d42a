use std::time::Duration;

use thiserror::Error;

/// Failures reported to the caller of the ranking engine.
///
/// Only input errors surface here. Remote failures, malformed model output
/// and empty candidate sets degrade to an empty but well-formed response.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("user request is required")]
    EmptyRequest,
}

/// Failure of a single call to the ranking service.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("ranking service timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}
