//! Order domain events.

use chrono::{DateTime, Utc};
use common::{SlotKey, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::{DomainEvent, SlotEffect};

use super::{
    BookingDecision, GoodsStatus, LineItem, Money, OrderNumber, PaymentDetails, ProviderSnapshot,
    ShippingAddress,
};

/// Events recorded on an order stream.
///
/// A booking stream starts with `BookingRequested`; a goods stream with
/// `GoodsOrderPlaced`. Each accepted status change is exactly one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    GoodsOrderPlaced(GoodsOrderPlacedData),
    BookingRequested(BookingRequestedData),
    GoodsStatusAdvanced(GoodsStatusAdvancedData),
    BookingDecided(BookingDecidedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::GoodsOrderPlaced(_) => "GoodsOrderPlaced",
            OrderEvent::BookingRequested(_) => "BookingRequested",
            OrderEvent::GoodsStatusAdvanced(_) => "GoodsStatusAdvanced",
            OrderEvent::BookingDecided(_) => "BookingDecided",
        }
    }

    fn slot_effect(&self) -> Option<SlotEffect> {
        match self {
            OrderEvent::BookingRequested(data) => Some(SlotEffect::Claim(data.slot.clone())),
            OrderEvent::BookingDecided(data) if data.decision == BookingDecision::Rejected => {
                Some(SlotEffect::Release(data.slot.clone()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsOrderPlacedData {
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub payment: PaymentDetails,
    pub shipping_address: ShippingAddress,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequestedData {
    pub order_number: OrderNumber,
    pub user_id: Option<UserId>,
    pub slot: SlotKey,
    pub provider: ProviderSnapshot,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsStatusAdvancedData {
    pub from: GoodsStatus,
    pub to: GoodsStatus,
    pub updated_by: UserId,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A pending booking was approved or rejected.
///
/// Carries the slot so a rejection can release it in the same append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDecidedData {
    pub decision: BookingDecision,
    pub slot: SlotKey,
    pub decided_by: Option<UserId>,
    pub note: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn goods_order_placed(
        order_number: OrderNumber,
        user_id: UserId,
        items: Vec<LineItem>,
        payment: PaymentDetails,
        shipping_address: ShippingAddress,
    ) -> Self {
        let total_amount = items.iter().map(LineItem::total_price).sum();
        OrderEvent::GoodsOrderPlaced(GoodsOrderPlacedData {
            order_number,
            user_id,
            items,
            total_amount,
            payment,
            shipping_address,
            placed_at: Utc::now(),
        })
    }

    pub fn booking_requested(
        order_number: OrderNumber,
        user_id: Option<UserId>,
        slot: SlotKey,
        provider: ProviderSnapshot,
    ) -> Self {
        OrderEvent::BookingRequested(BookingRequestedData {
            order_number,
            user_id,
            slot,
            provider,
            requested_at: Utc::now(),
        })
    }

    pub fn goods_status_advanced(
        from: GoodsStatus,
        to: GoodsStatus,
        updated_by: UserId,
        note: Option<String>,
    ) -> Self {
        OrderEvent::GoodsStatusAdvanced(GoodsStatusAdvancedData {
            from,
            to,
            updated_by,
            note,
            updated_at: Utc::now(),
        })
    }

    pub fn booking_decided(
        decision: BookingDecision,
        slot: SlotKey,
        decided_by: Option<UserId>,
        note: Option<String>,
    ) -> Self {
        OrderEvent::BookingDecided(BookingDecidedData {
            decision,
            slot,
            decided_by,
            note,
            decided_at: Utc::now(),
        })
    }
}
