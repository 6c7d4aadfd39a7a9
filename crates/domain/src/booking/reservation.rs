use chrono::{DateTime, Utc};
use common::{AggregateId, SlotKey, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::order::{BookingStatus, Order, OrderNumber};

/// Reservations share the booking status vocabulary.
pub type ReservationStatus = BookingStatus;

/// Resource-allocation view of a booking order.
///
/// The reservation id is the booking order's stream id, so the reservation
/// and the order are two reads of the same stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: AggregateId,
    pub order_number: OrderNumber,
    pub user_id: Option<UserId>,
    #[serde(flatten)]
    pub slot: SlotKey,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Derives the reservation from a booking order. Goods orders have none.
    pub fn from_order(order: &Order) -> Option<Self> {
        let booking = order.booking()?;
        Some(Self {
            id: order.id()?,
            order_number: order.order_number()?,
            user_id: order.user_id().cloned(),
            slot: booking.slot.clone(),
            status: booking.booking_status,
            created_at: order.created_at()?,
        })
    }

    /// Pending and approved reservations hold their slot.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
