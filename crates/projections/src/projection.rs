//! Core projection trait and position tracking.

use std::collections::HashMap;

use async_trait::async_trait;
use common::AggregateId;
use domain::{Aggregate, Order, OrderEvent};
use event_store::{EventEnvelope, Version};

use crate::Result;

/// How far a projection has read, kept per stream.
///
/// Log sequence numbers are handed out at insert time, so a transaction can
/// commit after one holding a later number. Tracking the last applied version
/// of each stream lets a late event still be delivered and keeps an event
/// already delivered from being delivered again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    /// Number of events delivered.
    pub events_processed: u64,
    streams: HashMap<AggregateId, Version>,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Last version delivered from a stream.
    pub fn stream_version(&self, aggregate_id: AggregateId) -> Version {
        self.streams
            .get(&aggregate_id)
            .copied()
            .unwrap_or_else(Version::initial)
    }

    pub fn has_seen(&self, event: &EventEnvelope) -> bool {
        event.version <= self.stream_version(event.aggregate_id)
    }

    /// True when `event` directly follows the last delivered version of its
    /// stream.
    pub fn is_next(&self, event: &EventEnvelope) -> bool {
        event.version == self.stream_version(event.aggregate_id).next()
    }

    /// Records `event` as delivered.
    pub fn advance(&mut self, event: &EventEnvelope) {
        self.streams.insert(event.aggregate_id, event.version);
        self.events_processed += 1;
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "position({} events, {} streams)",
            self.events_processed,
            self.streams.len()
        )
    }
}

/// A consumer of the committed event log.
///
/// Within a stream, events arrive in version order and exactly once between
/// resets. Events of different streams may interleave in any order.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Handles a single event.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    /// Resets the projection to its initial state.
    async fn reset(&self) -> Result<()>;
}

/// Decodes the payload of an order event.
///
/// Returns `None` for events of other aggregate families.
pub fn decode_order_event(event: &EventEnvelope) -> Result<Option<OrderEvent>> {
    if event.aggregate_type != Order::aggregate_type() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(event.payload.clone())?))
}
