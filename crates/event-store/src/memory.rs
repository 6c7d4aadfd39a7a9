use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, ProviderId, Result, SlotKey, Version,
    store::{AppendOptions, EventStore, EventStream, SlotClaim, validate_events_for_append},
};

#[derive(Default)]
struct MemoryState {
    /// Commit order.
    events: Vec<EventEnvelope>,
    claims: HashMap<SlotKey, SlotClaim>,
}

impl MemoryState {
    fn current_version(&self, aggregate_id: AggregateId) -> Version {
        self.events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial())
    }
}

/// In-memory store used by tests and the default binary.
///
/// Events and claims live behind a single lock, so an append and its slot
/// claims are applied together.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
    fail_appends: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent append fail with [`EventStoreError::Unavailable`].
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    pub async fn claim_count(&self) -> usize {
        self.state.read().await.claims.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let aggregate_id = validate_events_for_append(&events)?;

        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(EventStoreError::Unavailable(
                "in-memory store configured to fail appends".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let current_version = state.current_version(aggregate_id);

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Mirrors the unique (aggregate_id, version) constraint of the SQL schema.
        if let Some(first) = events.first()
            && first.version <= current_version
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        for slot in &options.claims {
            if let Some(existing) = state.claims.get(slot) {
                return Err(EventStoreError::SlotTaken {
                    slot: slot.clone(),
                    holder: Some(existing.holder),
                });
            }
        }

        let claimed_at = Utc::now();
        for slot in options.claims {
            state.claims.insert(
                slot.clone(),
                SlotClaim {
                    slot,
                    holder: aggregate_id,
                    claimed_at,
                },
            );
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version);
        state.events.extend(events);

        for slot in &options.releases {
            if state
                .claims
                .get(slot)
                .is_some_and(|claim| claim.holder == aggregate_id)
            {
                state.claims.remove(slot);
            }
        }

        metrics::counter!("event_store_appends_total", "store" => "memory").increment(1);
        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.state.read().await.events.clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max())
    }

    async fn slot_holder(&self, slot: &SlotKey) -> Result<Option<AggregateId>> {
        Ok(self.state.read().await.claims.get(slot).map(|c| c.holder))
    }

    async fn active_claims(&self, provider_id: &ProviderId) -> Result<Vec<SlotClaim>> {
        let state = self.state.read().await;
        let mut claims: Vec<_> = state
            .claims
            .values()
            .filter(|c| &c.slot.provider_id == provider_id)
            .cloned()
            .collect();
        claims.sort_by(|a, b| a.slot.cmp(&b.slot));
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStoreExt;

    fn create_test_event(aggregate_id: AggregateId, version: Version) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Order")
            .event_type("TestEvent")
            .version(version)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    fn slot() -> SlotKey {
        SlotKey::new("P1", "2024-05-01", "10:00")
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let version = store
            .append(
                vec![
                    create_test_event(id, Version::new(1)),
                    create_test_event(id, Version::new(2)),
                ],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        assert_eq!(version, Version::new(2));
        assert_eq!(store.get_events_for_aggregate(id).await.unwrap().len(), 2);
        assert_eq!(
            store.get_aggregate_version(id).await.unwrap(),
            Some(Version::new(2))
        );
    }

    #[tokio::test]
    async fn concurrency_conflict_on_wrong_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(
                vec![create_test_event(id, Version::first())],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let result = store
            .append(
                vec![create_test_event(id, Version::new(2))],
                AppendOptions::expect_version(Version::initial()),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn claim_is_written_with_the_events() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(
                vec![create_test_event(id, Version::first())],
                AppendOptions::expect_new().claiming(slot()),
            )
            .await
            .unwrap();

        assert_eq!(store.slot_holder(&slot()).await.unwrap(), Some(id));
        assert!(store.is_slot_claimed(&slot()).await.unwrap());
    }

    #[tokio::test]
    async fn second_claim_fails_and_writes_nothing() {
        let store = InMemoryEventStore::new();
        let first = AggregateId::new();
        let second = AggregateId::new();

        store
            .append(
                vec![create_test_event(first, Version::first())],
                AppendOptions::expect_new().claiming(slot()),
            )
            .await
            .unwrap();

        let result = store
            .append(
                vec![create_test_event(second, Version::first())],
                AppendOptions::expect_new().claiming(slot()),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::SlotTaken { holder: Some(h), .. }) if h == first
        ));
        assert!(store.get_aggregate_version(second).await.unwrap().is_none());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn release_frees_the_slot_for_its_holder_only() {
        let store = InMemoryEventStore::new();
        let holder = AggregateId::new();
        let other = AggregateId::new();

        store
            .append(
                vec![create_test_event(holder, Version::first())],
                AppendOptions::expect_new().claiming(slot()),
            )
            .await
            .unwrap();

        store
            .append(
                vec![create_test_event(other, Version::first())],
                AppendOptions::expect_new().releasing(slot()),
            )
            .await
            .unwrap();
        assert_eq!(store.slot_holder(&slot()).await.unwrap(), Some(holder));

        store
            .append(
                vec![create_test_event(holder, Version::new(2))],
                AppendOptions::expect_version(Version::first()).releasing(slot()),
            )
            .await
            .unwrap();
        assert_eq!(store.slot_holder(&slot()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn active_claims_are_scoped_to_provider() {
        let store = InMemoryEventStore::new();
        for (provider, time) in [("P1", "11:00"), ("P1", "09:00"), ("P2", "09:00")] {
            store
                .append(
                    vec![create_test_event(AggregateId::new(), Version::first())],
                    AppendOptions::expect_new().claiming(SlotKey::new(provider, "2024-05-01", time)),
                )
                .await
                .unwrap();
        }

        let claims = store.active_claims(&ProviderId::new("P1")).await.unwrap();
        let times: Vec<_> = claims.iter().map(|c| c.slot.time_slot.as_str()).collect();
        assert_eq!(times, vec!["09:00", "11:00"]);
    }

    #[tokio::test]
    async fn failing_store_rejects_appends() {
        let store = InMemoryEventStore::new();
        store.set_fail_appends(true);

        let result = store
            .append(
                vec![create_test_event(AggregateId::new(), Version::first())],
                AppendOptions::expect_new().claiming(slot()),
            )
            .await;

        assert!(matches!(result, Err(EventStoreError::Unavailable(_))));
        assert_eq!(store.claim_count().await, 0);
    }

    #[tokio::test]
    async fn stream_preserves_commit_order() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();
        for id in [a, b] {
            store
                .append(
                    vec![create_test_event(id, Version::first())],
                    AppendOptions::new(),
                )
                .await
                .unwrap();
        }

        let events: Vec<_> = store.stream_all_events().await.unwrap().collect().await;
        let ids: Vec<_> = events
            .into_iter()
            .map(|e| e.unwrap().aggregate_id)
            .collect();
        assert_eq!(ids, vec![a, b]);
    }
}
