//! Read models fed from the committed event log.
//!
//! - [`Projection`] trait for consuming events in per-stream version order
//! - [`ReadModel`] trait for query access to denormalized data
//! - [`ProjectionProcessor`] for catch-up delivery, once or on a timer
//! - Views: [`ReservationsView`] (bookings by user and provider) and
//!   [`OrderBookView`] (listings, per-user history, search)

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition, decode_order_event};
pub use read_model::ReadModel;
pub use views::{
    OrderBookView, OrderPage, OrderQuery, OrderSummary, Pagination, ReservationsView,
};
