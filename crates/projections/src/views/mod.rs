//! Read model views for the query side.

pub mod order_book;
pub mod reservations;

pub use order_book::{OrderBookView, OrderPage, OrderQuery, OrderSummary, Pagination};
pub use reservations::ReservationsView;
