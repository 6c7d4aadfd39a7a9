//! Core aggregate and domain event traits.

use common::{AggregateId, SlotKey};
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// What an event does to the slot-claim index when it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEffect {
    /// The appending stream takes the slot. The append fails if it is held.
    Claim(SlotKey),
    /// The appending stream gives the slot up.
    Release(SlotKey),
}

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;

    /// Slot-claim change that must commit together with this event.
    fn slot_effect(&self) -> Option<SlotEffect> {
        None
    }
}

/// Trait for aggregates in an event-sourced system.
///
/// Aggregates are rebuilt by replaying their stream, decide new events from
/// commands, and apply events to update state. `apply` is pure and never fails.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identifier, or `None` before its first event.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the current stream version.
    fn version(&self) -> Version;

    /// Sets the stream version. Called by the command handler after loading.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
