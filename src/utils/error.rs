use std::time::Duration;
use thiserror::Error;

/// Failures talking to the shared key-value store.
///
/// Callers in the coordination layer treat `Unavailable` as a degraded-mode
/// signal and fail open; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unexpected store reply: {0}")]
    Protocol(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Error taxonomy of the coordination layer.
///
/// These are typed results, not swallowed exceptions: components return them,
/// and only the coordinator converts them into safe defaults (permissive
/// admission, cache bypass, fallback reply) while logging each occurrence.
/// None of them ever crosses into the ingestion boundary.
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("generation timed out after {0:?}")]
    ComputeTimeout(Duration),

    #[error("generation failed: {0}")]
    ComputeFailure(String),

    #[error("invalid inbound event: {0}")]
    InvalidInput(&'static str),
}
