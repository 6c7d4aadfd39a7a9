//! Provider slot bookings.

mod conflict;
mod coordinator;
mod provider;
mod reservation;

pub use conflict::ConflictResolver;
pub use coordinator::ReservationCoordinator;
pub use provider::{InMemoryProviderDirectory, ProviderDirectory};
pub use reservation::{Reservation, ReservationStatus};
