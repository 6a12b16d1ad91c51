//! Unified Error Model
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrowdError {
    #[error("HISTORY/{0}")]
    History(#[from] HistoryError),

    #[error("PROVIDER/{0}")]
    Provider(#[from] ProviderError),

    #[error("CONFIG/{0}")]
    Config(String),
}

/// Failure of the weather provider collaborator.
///
/// Every variant degrades the weather cross-check to zero credit; none of
/// them aborts an evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("missing credential")]
    MissingCredential,

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Failure of the report history collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}
