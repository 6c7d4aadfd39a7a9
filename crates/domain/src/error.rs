//! Domain error types.

use common::SlotKey;
use event_store::EventStoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Coarse classification of a failed operation.
///
/// Callers map these to user-visible responses; the variants carry no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or malformed input.
    Validation,
    /// The requested resource is already taken, or a concurrent write won.
    Conflict,
    /// The referenced order, reservation or provider does not exist.
    NotFound,
    /// The requested status is not reachable from the current one.
    InvalidTransition,
    /// Persistence failed.
    StoreFailure,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(EventStoreError),

    #[error(transparent)]
    Order(#[from] OrderError),

    /// The requested provider slot is held by another active booking.
    #[error("This provider is not available at the selected date and time slot.")]
    SlotUnavailable { slot: SlotKey },

    #[error("{aggregate_type} not found: {id}")]
    NotFound {
        aggregate_type: &'static str,
        id: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
                ErrorKind::Conflict
            }
            DomainError::EventStore(_) | DomainError::Serialization(_) => ErrorKind::StoreFailure,
            DomainError::Order(e) => e.kind(),
            DomainError::SlotUnavailable { .. } => ErrorKind::Conflict,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    pub fn order_not_found(id: impl ToString) -> Self {
        DomainError::NotFound {
            aggregate_type: "Order",
            id: id.to_string(),
        }
    }
}

impl From<EventStoreError> for DomainError {
    fn from(e: EventStoreError) -> Self {
        match e {
            // A lost claim race reports the same conflict as the pre-check.
            EventStoreError::SlotTaken { slot, .. } => DomainError::SlotUnavailable { slot },
            other => DomainError::EventStore(other),
        }
    }
}
