use common::SlotKey;
use event_store::{EventStore, EventStoreExt};

use crate::error::DomainError;

/// Answers whether a provider slot is held by an active booking.
///
/// This is a read-only pre-check. Two callers can both see a slot as free;
/// the claim made by the booking append decides which of them gets it.
pub struct ConflictResolver<S: EventStore> {
    store: S,
}

impl<S: EventStore> ConflictResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, slot), fields(slot = %slot))]
    pub async fn is_slot_free(&self, slot: &SlotKey) -> Result<bool, DomainError> {
        Ok(!self.store.is_slot_claimed(slot).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AggregateId;
    use event_store::{AppendOptions, EventEnvelope, InMemoryEventStore, Version};

    #[tokio::test]
    async fn reflects_claims_in_store() {
        let store = InMemoryEventStore::new();
        let resolver = ConflictResolver::new(store.clone());
        let slot = SlotKey::new("P1", "2024-05-01", "10:00");

        assert!(resolver.is_slot_free(&slot).await.unwrap());

        let event = EventEnvelope::builder()
            .aggregate_id(AggregateId::new())
            .aggregate_type("Order")
            .event_type("BookingRequested")
            .version(Version::first())
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap();
        store
            .append(vec![event], AppendOptions::expect_new().claiming(slot.clone()))
            .await
            .unwrap();

        assert!(!resolver.is_slot_free(&slot).await.unwrap());
        assert!(
            resolver
                .is_slot_free(&SlotKey::new("P1", "2024-05-01", "11:00"))
                .await
                .unwrap()
        );
    }
}
