//! Status vocabularies for goods and booking orders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Fulfilment status of a goods order.
///
/// Variants are declared in fulfilment order, so `Ord` follows the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GoodsStatus {
    #[serde(rename = "Order Placed")]
    OrderPlaced,
    Processing,
    Shipped,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
}

impl GoodsStatus {
    pub const ALL: [GoodsStatus; 5] = [
        GoodsStatus::OrderPlaced,
        GoodsStatus::Processing,
        GoodsStatus::Shipped,
        GoodsStatus::OutForDelivery,
        GoodsStatus::Delivered,
    ];

    /// Position in the fulfilment sequence, starting at 0.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoodsStatus::OrderPlaced => "Order Placed",
            GoodsStatus::Processing => "Processing",
            GoodsStatus::Shipped => "Shipped",
            GoodsStatus::OutForDelivery => "Out for Delivery",
            GoodsStatus::Delivered => "Delivered",
        }
    }

    /// Whether `next` may follow this status.
    ///
    /// Staying put and skipping ahead are both allowed; going back is not.
    pub fn can_advance_to(self, next: GoodsStatus) -> bool {
        next >= self
    }

    /// Share of the sequence completed, in percent.
    pub fn progress_percentage(self) -> u8 {
        ((self.index() + 1) * 100 / Self::ALL.len()) as u8
    }

    pub fn is_terminal(self) -> bool {
        self == GoodsStatus::Delivered
    }
}

impl fmt::Display for GoodsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoodsStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoodsStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::UnknownStatus {
                status: s.to_string(),
            })
    }
}

/// Status of a booking order and of its reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }

    /// Pending and approved bookings hold their slot.
    pub fn is_active(self) -> bool {
        !matches!(self, BookingStatus::Rejected)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            _ => Err(OrderError::UnknownStatus {
                status: s.to_string(),
            }),
        }
    }
}

/// The only statuses a pending booking can move to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingDecision {
    Approved,
    Rejected,
}

impl BookingDecision {
    pub fn as_str(self) -> &'static str {
        BookingStatus::from(self).as_str()
    }
}

impl From<BookingDecision> for BookingStatus {
    fn from(decision: BookingDecision) -> Self {
        match decision {
            BookingDecision::Approved => BookingStatus::Approved,
            BookingDecision::Rejected => BookingStatus::Rejected,
        }
    }
}

impl fmt::Display for BookingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingDecision {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(BookingDecision::Approved),
            "rejected" => Ok(BookingDecision::Rejected),
            _ => Err(OrderError::InvalidBookingStatus {
                status: s.to_string(),
            }),
        }
    }
}

/// Current status of any order, tagged by the machine it belongs to.
///
/// Serialized as the bare status string; the two vocabularies do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderStatus {
    Goods(GoodsStatus),
    Booking(BookingStatus),
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Goods(status) => status.as_str(),
            OrderStatus::Booking(status) => status.as_str(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GoodsStatus> for OrderStatus {
    fn from(status: GoodsStatus) -> Self {
        OrderStatus::Goods(status)
    }
}

impl From<BookingStatus> for OrderStatus {
    fn from(status: BookingStatus) -> Self {
        OrderStatus::Booking(status)
    }
}
