//! Notification error types.

use thiserror::Error;

use crate::notification::NotificationId;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// The sink could not store or update a notification.
    #[error("Notification storage error: {0}")]
    Storage(String),

    #[error("Notification not found: {0}")]
    NotFound(NotificationId),
}

/// Convenience type alias for notification results.
pub type Result<T> = std::result::Result<T, NotificationError>;
