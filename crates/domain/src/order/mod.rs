//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod history;
mod service;
mod status;
mod value_objects;

pub use aggregate::{BookingOrder, GoodsOrder, Order, OrderKind};
pub(crate) use aggregate::validate_slot;
pub use commands::*;
pub use events::{
    BookingDecidedData, BookingRequestedData, GoodsOrderPlacedData, GoodsStatusAdvancedData,
    OrderEvent,
};
pub use history::{AuditLog, StatusHistoryEntry};
pub use service::OrderService;
pub use status::{BookingDecision, BookingStatus, GoodsStatus, OrderStatus};
pub use value_objects::{
    AddressType, LineItem, Money, OrderNumber, OrderType, PaymentDetails, ProductId,
    ProviderSnapshot, ShippingAddress,
};

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors raised by the order aggregate.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Order has no items")]
    NoItems,

    #[error("Invalid quantity for item {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: String },

    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(String),

    #[error("Order already created")]
    AlreadyCreated,

    #[error("Order not found")]
    NotCreated,

    #[error("Invalid order status: {status}")]
    UnknownStatus { status: String },

    #[error("Cannot revert order status from {from} to {to}")]
    BackwardTransition { from: GoodsStatus, to: GoodsStatus },

    #[error("Invalid status for booking: {status}. Only approved/rejected allowed.")]
    InvalidBookingStatus { status: String },

    #[error("Booking has already been {status}")]
    BookingAlreadyDecided { status: BookingStatus },

    #[error("Order is not a booking")]
    NotABooking,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::MissingField(_)
            | OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidOrderNumber(_) => ErrorKind::Validation,
            OrderError::AlreadyCreated => ErrorKind::Conflict,
            OrderError::NotCreated => ErrorKind::NotFound,
            OrderError::UnknownStatus { .. }
            | OrderError::BackwardTransition { .. }
            | OrderError::InvalidBookingStatus { .. }
            | OrderError::BookingAlreadyDecided { .. }
            | OrderError::NotABooking => ErrorKind::InvalidTransition,
        }
    }
}
