//! Queue error types.

use offhours_core::CoreError;
use offhours_notify::NotifyError;
use thiserror::Error;

/// Failures of the record store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("malformed record {id}: {reason}")]
    Malformed { id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("chat error: {0}")]
    Notify(#[from] NotifyError),
}
