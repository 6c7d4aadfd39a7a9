//! Append-only event storage for order streams.
//!
//! Besides events, the store owns the slot-claim index: the set of
//! (provider, date, timeslot) tuples held by an active booking. Claims and
//! releases ride along with an append so that a booking and its resource lock
//! are written in one atomic step.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{AggregateId, ProviderId, SlotKey};
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream, SlotClaim};
