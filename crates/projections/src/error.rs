//! Projection error types.

use thiserror::Error;

/// Errors raised while feeding the event log into read models.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Reading the log failed.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// An order event payload did not decode.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
