//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, SlotKey, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    AuditLog, BookingDecision, BookingStatus, GoodsStatus, LineItem, Money, OrderError, OrderEvent,
    OrderNumber, OrderStatus, OrderType, PaymentDetails, ProviderSnapshot, ShippingAddress,
    StatusHistoryEntry,
    events::{BookingDecidedData, BookingRequestedData, GoodsOrderPlacedData, GoodsStatusAdvancedData},
};

/// Goods-specific fields and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodsOrder {
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub payment_details: PaymentDetails,
    pub shipping_address: ShippingAddress,
    pub status: GoodsStatus,
}

/// Booking-specific fields and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOrder {
    #[serde(flatten)]
    pub slot: SlotKey,
    pub provider: ProviderSnapshot,
    pub booking_status: BookingStatus,
}

/// The two kinds of order. Each carries its own status type, so a goods
/// order can never hold a booking status or the reverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OrderKind {
    Goods(GoodsOrder),
    Booking(BookingOrder),
}

impl OrderKind {
    pub fn order_type(&self) -> OrderType {
        match self {
            OrderKind::Goods(_) => OrderType::Goods,
            OrderKind::Booking(_) => OrderType::Booking,
        }
    }

    pub fn status(&self) -> OrderStatus {
        match self {
            OrderKind::Goods(goods) => goods.status.into(),
            OrderKind::Booking(booking) => booking.booking_status.into(),
        }
    }
}

/// Order aggregate root.
///
/// Covers both goods orders and booking orders. The status history is
/// derived from the same events that move the status, so its last entry
/// always matches the current status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    order_number: Option<OrderNumber>,

    /// `None` only for anonymous bookings.
    user_id: Option<UserId>,

    kind: Option<OrderKind>,

    history: AuditLog,

    created_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::GoodsOrderPlaced(data) => self.apply_goods_order_placed(data),
            OrderEvent::BookingRequested(data) => self.apply_booking_requested(data),
            OrderEvent::GoodsStatusAdvanced(data) => self.apply_goods_status_advanced(data),
            OrderEvent::BookingDecided(data) => self.apply_booking_decided(data),
        }
    }
}

// Query methods
impl Order {
    pub fn order_number(&self) -> Option<OrderNumber> {
        self.order_number
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn kind(&self) -> Option<&OrderKind> {
        self.kind.as_ref()
    }

    pub fn order_type(&self) -> Option<OrderType> {
        self.kind.as_ref().map(OrderKind::order_type)
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.kind.as_ref().map(OrderKind::status)
    }

    pub fn goods(&self) -> Option<&GoodsOrder> {
        match &self.kind {
            Some(OrderKind::Goods(goods)) => Some(goods),
            _ => None,
        }
    }

    pub fn booking(&self) -> Option<&BookingOrder> {
        match &self.kind {
            Some(OrderKind::Booking(booking)) => Some(booking),
            _ => None,
        }
    }

    pub fn history(&self) -> &AuditLog {
        &self.history
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Fulfilment progress of a goods order, in percent.
    pub fn progress_percentage(&self) -> Option<u8> {
        self.goods().map(|goods| goods.status.progress_percentage())
    }
}

// Command methods (return events)
impl Order {
    /// Places a goods order.
    pub fn place_goods(
        &self,
        order_id: AggregateId,
        user_id: UserId,
        items: Vec<LineItem>,
        payment: PaymentDetails,
        shipping_address: ShippingAddress,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyCreated);
        }
        if user_id.as_str().trim().is_empty() {
            return Err(OrderError::MissingField("userId"));
        }
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id.to_string(),
            });
        }

        Ok(vec![OrderEvent::goods_order_placed(
            OrderNumber::new(OrderType::Goods, order_id),
            user_id,
            items,
            payment,
            shipping_address,
        )])
    }

    /// Requests a booking of a provider slot.
    ///
    /// The resulting event claims the slot when appended.
    pub fn request_booking(
        &self,
        order_id: AggregateId,
        user_id: Option<UserId>,
        slot: SlotKey,
        provider: ProviderSnapshot,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyCreated);
        }
        validate_slot(&slot)?;

        Ok(vec![OrderEvent::booking_requested(
            OrderNumber::new(OrderType::Booking, order_id),
            user_id.filter(|u| !u.as_str().trim().is_empty()),
            slot,
            provider,
        )])
    }

    /// Moves the order to `requested`, following the rules of its kind.
    ///
    /// Goods orders accept any status at or after the current one. Booking
    /// orders accept only `approved` or `rejected`, and only while pending.
    pub fn update_status(
        &self,
        requested: &str,
        actor: UserId,
        note: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match self.kind.as_ref().ok_or(OrderError::NotCreated)? {
            OrderKind::Goods(goods) => {
                let next: GoodsStatus = requested.parse()?;
                if !goods.status.can_advance_to(next) {
                    return Err(OrderError::BackwardTransition {
                        from: goods.status,
                        to: next,
                    });
                }
                Ok(vec![OrderEvent::goods_status_advanced(
                    goods.status,
                    next,
                    actor,
                    normalize_note(note),
                )])
            }
            OrderKind::Booking(_) => {
                let decision: BookingDecision = requested.parse()?;
                self.decide(decision, Some(actor), note)
            }
        }
    }

    /// Approves or rejects a pending booking.
    pub fn decide(
        &self,
        decision: BookingDecision,
        actor: Option<UserId>,
        note: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let booking = match self.kind.as_ref().ok_or(OrderError::NotCreated)? {
            OrderKind::Booking(booking) => booking,
            OrderKind::Goods(_) => return Err(OrderError::NotABooking),
        };

        if booking.booking_status.is_terminal() {
            return Err(OrderError::BookingAlreadyDecided {
                status: booking.booking_status,
            });
        }

        Ok(vec![OrderEvent::booking_decided(
            decision,
            booking.slot.clone(),
            actor,
            normalize_note(note),
        )])
    }
}

pub(crate) fn validate_slot(slot: &SlotKey) -> Result<(), OrderError> {
    if slot.provider_id.as_str().trim().is_empty() {
        return Err(OrderError::MissingField("providerId"));
    }
    if slot.date.trim().is_empty() {
        return Err(OrderError::MissingField("date"));
    }
    if slot.time_slot.trim().is_empty() {
        return Err(OrderError::MissingField("timeSlot"));
    }
    Ok(())
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

// Event application
impl Order {
    fn apply_goods_order_placed(&mut self, data: GoodsOrderPlacedData) {
        self.id = Some(data.order_number.aggregate_id());
        self.order_number = Some(data.order_number);
        self.history.append(StatusHistoryEntry {
            status: GoodsStatus::OrderPlaced.into(),
            updated_by: Some(data.user_id.clone()),
            updated_at: data.placed_at,
            note: None,
        });
        self.user_id = Some(data.user_id);
        self.created_at = Some(data.placed_at);
        self.kind = Some(OrderKind::Goods(GoodsOrder {
            items: data.items,
            total_amount: data.total_amount,
            payment_details: data.payment,
            shipping_address: data.shipping_address,
            status: GoodsStatus::OrderPlaced,
        }));
    }

    fn apply_booking_requested(&mut self, data: BookingRequestedData) {
        self.id = Some(data.order_number.aggregate_id());
        self.order_number = Some(data.order_number);
        self.history.append(StatusHistoryEntry {
            status: BookingStatus::Pending.into(),
            updated_by: data.user_id.clone(),
            updated_at: data.requested_at,
            note: None,
        });
        self.user_id = data.user_id;
        self.created_at = Some(data.requested_at);
        self.kind = Some(OrderKind::Booking(BookingOrder {
            slot: data.slot,
            provider: data.provider,
            booking_status: BookingStatus::Pending,
        }));
    }

    fn apply_goods_status_advanced(&mut self, data: GoodsStatusAdvancedData) {
        if let Some(OrderKind::Goods(goods)) = &mut self.kind {
            goods.status = data.to;
        }
        self.history.append(StatusHistoryEntry {
            status: data.to.into(),
            updated_by: Some(data.updated_by),
            updated_at: data.updated_at,
            note: data.note,
        });
    }

    fn apply_booking_decided(&mut self, data: BookingDecidedData) {
        let status = BookingStatus::from(data.decision);
        if let Some(OrderKind::Booking(booking)) = &mut self.kind {
            booking.booking_status = status;
        }
        self.history.append(StatusHistoryEntry {
            status: status.into(),
            updated_by: data.decided_by,
            updated_at: data.decided_at,
            note: data.note,
        });
    }
}
