//! Error types for the timeline-sync core.

use thiserror::Error;

/// Errors that can occur below the HTTP layer.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Monday API error: {0}")]
    Api(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, SyncError>;
