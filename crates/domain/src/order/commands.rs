//! Order commands.

use common::{AggregateId, SlotKey, UserId};

use super::{BookingDecision, LineItem, PaymentDetails, ProviderSnapshot, ShippingAddress};

/// Command to place a goods order.
#[derive(Debug, Clone)]
pub struct PlaceGoodsOrder {
    pub order_id: AggregateId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub payment: PaymentDetails,
    pub shipping_address: ShippingAddress,
}

impl PlaceGoodsOrder {
    /// Creates the command with a generated order id.
    pub fn new(user_id: impl Into<UserId>, items: Vec<LineItem>) -> Self {
        Self {
            order_id: AggregateId::new(),
            user_id: user_id.into(),
            items,
            payment: PaymentDetails::default(),
            shipping_address: ShippingAddress::default(),
        }
    }

    pub fn with_payment(mut self, payment: PaymentDetails) -> Self {
        self.payment = payment;
        self
    }

    pub fn with_shipping_address(mut self, address: ShippingAddress) -> Self {
        self.shipping_address = address;
        self
    }
}

/// Command to open a booking stream for a provider slot.
#[derive(Debug, Clone)]
pub struct RequestBooking {
    pub order_id: AggregateId,
    pub user_id: Option<UserId>,
    pub slot: SlotKey,
    pub provider: ProviderSnapshot,
}

/// Command to move an order to a named status.
#[derive(Debug, Clone)]
pub struct UpdateOrderStatus {
    pub order_id: AggregateId,
    pub status: String,
    pub actor: UserId,
    pub note: Option<String>,
}

impl UpdateOrderStatus {
    pub fn new(order_id: AggregateId, status: impl Into<String>, actor: impl Into<UserId>) -> Self {
        Self {
            order_id,
            status: status.into(),
            actor: actor.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Command to approve or reject a pending booking.
#[derive(Debug, Clone)]
pub struct DecideBooking {
    pub order_id: AggregateId,
    pub decision: BookingDecision,
    pub actor: Option<UserId>,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Money;

    #[test]
    fn place_goods_order_generates_unique_ids() {
        let items = vec![LineItem::new("SKU-1", "Trowel", Money::from_minor(100), 1)];
        let a = PlaceGoodsOrder::new("u1", items.clone());
        let b = PlaceGoodsOrder::new("u1", items);
        assert_ne!(a.order_id, b.order_id);
    }

    #[test]
    fn update_status_builder() {
        let id = AggregateId::new();
        let cmd = UpdateOrderStatus::new(id, "Shipped", "admin").with_note("Left the depot");

        assert_eq!(cmd.order_id, id);
        assert_eq!(cmd.status, "Shipped");
        assert_eq!(cmd.actor.as_str(), "admin");
        assert_eq!(cmd.note.as_deref(), Some("Left the depot"));
    }
}
