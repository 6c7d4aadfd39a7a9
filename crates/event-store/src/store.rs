use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::{AggregateId, EventEnvelope, EventStoreError, ProviderId, Result, SlotKey, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected stream version. `None` skips the check.
    pub expected_version: Option<Version>,

    /// Slots to claim for the appending stream. The append fails with
    /// [`EventStoreError::SlotTaken`] if any of them is already held, and
    /// nothing is written.
    pub claims: Vec<SlotKey>,

    /// Slots the appending stream gives up. Releasing a slot held by another
    /// stream, or not held at all, is a no-op.
    pub releases: Vec<SlotKey>,
}

impl AppendOptions {
    /// Creates options with no version check and no slot effects.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
            ..Self::default()
        }
    }

    /// Expects the stream to be empty.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }

    pub fn claiming(mut self, slot: SlotKey) -> Self {
        self.claims.push(slot);
        self
    }

    pub fn releasing(mut self, slot: SlotKey) -> Self {
        self.releases.push(slot);
        self
    }
}

/// An active hold on a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotClaim {
    pub slot: SlotKey,
    pub holder: AggregateId,
    pub claimed_at: DateTime<Utc>,
}

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Storage for order streams and the slot-claim index.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to a single stream.
    ///
    /// The version check, slot claims, event inserts and slot releases happen
    /// atomically: either all take effect or none do.
    ///
    /// Returns the stream version after the append.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// Returns a stream's events in version order.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Streams every stored event in sequence order. A transaction that
    /// commits late can add events before ones already streamed.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Returns the current version of a stream, or `None` if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Returns the stream currently holding `slot`, if any.
    async fn slot_holder(&self, slot: &SlotKey) -> Result<Option<AggregateId>>;

    /// Returns every active claim for a provider, ordered by date then slot.
    async fn active_claims(&self, provider_id: &ProviderId) -> Result<Vec<SlotClaim>>;
}

/// Convenience methods available on every store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn is_slot_claimed(&self, slot: &SlotKey) -> Result<bool> {
        Ok(self.slot_holder(slot).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch targets one stream with consecutive versions.
///
/// Returns the batch's stream id.
pub(crate) fn validate_events_for_append(events: &[EventEnvelope]) -> Result<AggregateId> {
    let Some((first, rest)) = events.split_first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty event list".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for event in rest {
        if event.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidAppend(
                "all events must belong to the same aggregate".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential: expected {expected_version}, got {}",
                event.version
            )));
        }
    }

    Ok(first.aggregate_id)
}
