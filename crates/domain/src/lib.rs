//! Domain layer for the marketplace order and booking engine.
//!
//! - `Aggregate` / `DomainEvent` traits and the `CommandHandler`
//! - the `Order` aggregate with separate goods and booking status machines
//!   and an append-only status history
//! - the booking side: `ConflictResolver` and `ReservationCoordinator`

pub mod aggregate;
pub mod booking;
pub mod command;
pub mod error;
pub mod order;

pub use aggregate::{Aggregate, DomainEvent, SlotEffect};
pub use booking::{
    ConflictResolver, InMemoryProviderDirectory, ProviderDirectory, Reservation,
    ReservationCoordinator, ReservationStatus,
};
pub use command::{CommandHandler, CommandResult};
pub use error::{DomainError, ErrorKind};
pub use order::{
    AddressType, AuditLog, BookingDecision, BookingOrder, BookingStatus, DecideBooking,
    GoodsOrder, GoodsStatus, LineItem, Money, Order, OrderError, OrderEvent, OrderKind,
    OrderNumber, OrderService, OrderStatus, OrderType, PaymentDetails, PlaceGoodsOrder, ProductId,
    ProviderSnapshot, RequestBooking, ShippingAddress, StatusHistoryEntry, UpdateOrderStatus,
};
