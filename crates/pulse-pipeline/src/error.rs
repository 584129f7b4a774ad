use thiserror::Error;

/// Failure at the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error(transparent)]
    Db(#[from] pulse_db::DbError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure from a sentiment scorer. Never fatal: the link is kept without a score.
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("scorer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("scorer returned status {0}")]
    Status(u16),
    #[error("scorer timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("invalid scorer response: {0}")]
    InvalidResponse(String),
}

/// Failures that abort a cycle or keep the pipeline from being assembled.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read keyword registry: {0}")]
    KeywordRegistry(#[source] StoreError),
    #[error("failed to build source adapters: {0}")]
    Adapters(#[from] pulse_sources::SourceError),
    #[error("failed to build sentiment scorer: {0}")]
    Scorer(#[from] ScorerError),
}
