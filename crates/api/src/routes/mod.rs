//! HTTP route handlers.

pub mod bookings;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;

use common::AggregateId;
use domain::OrderNumber;

/// Accepts a customer-facing order number (`OD-...`, `GD-...`) or a raw
/// stream id.
pub(crate) fn resolve_order_id(raw: &str) -> Option<AggregateId> {
    let raw = raw.trim();
    if let Ok(number) = raw.parse::<OrderNumber>() {
        return Some(number.aggregate_id());
    }
    uuid::Uuid::try_parse(raw).ok().map(AggregateId::from_uuid)
}
