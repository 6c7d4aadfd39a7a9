use common::{AggregateId, ProviderId, SlotKey, UserId};
use event_store::EventStore;

use crate::error::DomainError;
use crate::order::{
    BookingDecision, DecideBooking, OrderError, OrderService, RequestBooking, validate_slot,
};

use super::{ConflictResolver, ProviderDirectory, Reservation};

/// Creates bookings and records decisions on them.
///
/// A booking is one order stream. Creating it appends `BookingRequested`
/// with a claim on the slot; approving or rejecting it appends one
/// `BookingDecided`. Both the reservation and the order are read from
/// that stream, so they cannot disagree.
pub struct ReservationCoordinator<S, P>
where
    S: EventStore + Clone,
    P: ProviderDirectory,
{
    store: S,
    orders: OrderService<S>,
    resolver: ConflictResolver<S>,
    providers: P,
}

impl<S, P> ReservationCoordinator<S, P>
where
    S: EventStore + Clone,
    P: ProviderDirectory,
{
    pub fn new(store: S, providers: P) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            resolver: ConflictResolver::new(store.clone()),
            store,
            providers,
        }
    }

    /// Books `slot` for `user_id` (or anonymously).
    ///
    /// Fails with a validation error on blank slot fields and with
    /// [`DomainError::SlotUnavailable`] when the slot is held, whether the
    /// pre-check or the atomic claim detects it.
    #[tracing::instrument(skip(self, slot), fields(slot = %slot))]
    pub async fn create_booking(
        &self,
        user_id: Option<UserId>,
        slot: SlotKey,
    ) -> Result<Reservation, DomainError> {
        validate_slot(&slot)?;

        if !self.resolver.is_slot_free(&slot).await? {
            metrics::counter!("booking_conflicts_total", "stage" => "precheck").increment(1);
            tracing::info!("slot already held");
            return Err(DomainError::SlotUnavailable { slot });
        }

        let provider = self
            .providers
            .find(&slot.provider_id)
            .await
            .unwrap_or_else(|| {
                tracing::warn!(
                    provider_id = %slot.provider_id,
                    "provider not in directory, booking with empty snapshot"
                );
                Default::default()
            });

        let order_id = AggregateId::new();
        let result = self
            .orders
            .request_booking(RequestBooking {
                order_id,
                user_id,
                slot,
                provider,
            })
            .await;

        let result = match result {
            Ok(result) => result,
            Err(err @ DomainError::SlotUnavailable { .. }) => {
                metrics::counter!("booking_conflicts_total", "stage" => "claim").increment(1);
                tracing::info!("lost slot claim to a concurrent booking");
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        metrics::counter!("bookings_created_total").increment(1);
        tracing::info!(reservation_id = %order_id, "booking created");

        Reservation::from_order(&result.aggregate)
            .ok_or_else(|| DomainError::order_not_found(order_id))
    }

    pub async fn approve(
        &self,
        reservation_id: AggregateId,
        actor: Option<UserId>,
        note: Option<String>,
    ) -> Result<Reservation, DomainError> {
        self.decide(reservation_id, BookingDecision::Approved, actor, note)
            .await
    }

    /// Rejects a pending booking and frees its slot.
    pub async fn reject(
        &self,
        reservation_id: AggregateId,
        actor: Option<UserId>,
        note: Option<String>,
    ) -> Result<Reservation, DomainError> {
        self.decide(reservation_id, BookingDecision::Rejected, actor, note)
            .await
    }

    #[tracing::instrument(skip(self, actor, note))]
    async fn decide(
        &self,
        reservation_id: AggregateId,
        decision: BookingDecision,
        actor: Option<UserId>,
        note: Option<String>,
    ) -> Result<Reservation, DomainError> {
        let result = self
            .orders
            .decide_booking(DecideBooking {
                order_id: reservation_id,
                decision,
                actor,
                note,
            })
            .await
            .map_err(|err| match err {
                // Goods orders are not reservations.
                DomainError::Order(OrderError::NotCreated | OrderError::NotABooking) => {
                    reservation_not_found(reservation_id)
                }
                other => other,
            })?;

        Reservation::from_order(&result.aggregate)
            .ok_or_else(|| reservation_not_found(reservation_id))
    }

    pub async fn get_reservation(
        &self,
        reservation_id: AggregateId,
    ) -> Result<Option<Reservation>, DomainError> {
        Ok(self
            .orders
            .get_order(reservation_id)
            .await?
            .as_ref()
            .and_then(Reservation::from_order))
    }

    /// Pending and approved bookings of a provider, ordered by date then slot.
    ///
    /// Read from the claim index, so it reflects every committed booking.
    #[tracing::instrument(skip(self))]
    pub async fn active_bookings_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Vec<Reservation>, DomainError> {
        let claims = self.store.active_claims(provider_id).await?;

        let mut reservations = Vec::with_capacity(claims.len());
        for claim in claims {
            if let Some(reservation) = self.get_reservation(claim.holder).await? {
                reservations.push(reservation);
            }
        }
        Ok(reservations)
    }
}

fn reservation_not_found(id: AggregateId) -> DomainError {
    DomainError::NotFound {
        aggregate_type: "Reservation",
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::booking::{InMemoryProviderDirectory, ReservationStatus};
    use crate::error::ErrorKind;
    use crate::order::{
        BookingStatus, LineItem, Money, OrderStatus, PlaceGoodsOrder, ProviderSnapshot,
    };
    use event_store::{EventStoreExt, InMemoryEventStore};

    fn slot(time: &str) -> SlotKey {
        SlotKey::new("P1", "2024-05-01", time)
    }

    async fn coordinator() -> (
        ReservationCoordinator<InMemoryEventStore, InMemoryProviderDirectory>,
        InMemoryEventStore,
    ) {
        let store = InMemoryEventStore::new();
        let providers = InMemoryProviderDirectory::new();
        providers
            .upsert(
                "P1",
                ProviderSnapshot {
                    name: "Asha".to_string(),
                    specialization: "Lawn care".to_string(),
                    contact_info: "asha@example.com".to_string(),
                    location: "Pune".to_string(),
                    profile_image: "asha.png".to_string(),
                },
            )
            .await;
        (ReservationCoordinator::new(store.clone(), providers), store)
    }

    #[tokio::test]
    async fn booking_scenario() {
        let (coordinator, _) = coordinator().await;

        let reservation = coordinator
            .create_booking(Some(UserId::new("u1")), slot("10:00"))
            .await
            .unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);

        let err = coordinator
            .create_booking(Some(UserId::new("u2")), slot("10:00"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let approved = coordinator
            .approve(reservation.id, Some(UserId::new("admin")), None)
            .await
            .unwrap();
        assert_eq!(approved.status, ReservationStatus::Approved);

        let order = coordinator
            .orders
            .get_order(reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status(), Some(OrderStatus::Booking(BookingStatus::Approved)));
        assert_eq!(order.history().len(), 2);
    }

    #[tokio::test]
    async fn snapshot_is_copied_from_directory() {
        let (coordinator, _) = coordinator().await;

        let reservation = coordinator
            .create_booking(None, slot("09:00"))
            .await
            .unwrap();
        let order = coordinator
            .orders
            .get_order(reservation.id)
            .await
            .unwrap()
            .unwrap();

        let booking = order.booking().unwrap();
        assert_eq!(booking.provider.name, "Asha");
        assert_eq!(booking.provider.location, "Pune");
    }

    #[tokio::test]
    async fn unknown_provider_books_with_empty_snapshot() {
        let (coordinator, _) = coordinator().await;

        let reservation = coordinator
            .create_booking(None, SlotKey::new("P9", "2024-05-01", "09:00"))
            .await
            .unwrap();
        let order = coordinator
            .orders
            .get_order(reservation.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(order.booking().unwrap().provider, ProviderSnapshot::default());
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let (coordinator, store) = coordinator().await;

        for bad in [
            SlotKey::new("", "2024-05-01", "10:00"),
            SlotKey::new("P1", "", "10:00"),
            SlotKey::new("P1", "2024-05-01", ""),
        ] {
            let err = coordinator.create_booking(None, bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn rejection_frees_slot_for_rebooking() {
        let (coordinator, store) = coordinator().await;

        let first = coordinator
            .create_booking(Some(UserId::new("u1")), slot("10:00"))
            .await
            .unwrap();
        let rejected = coordinator
            .reject(first.id, None, Some("Provider on leave".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.status, ReservationStatus::Rejected);
        assert!(!store.is_slot_claimed(&slot("10:00")).await.unwrap());

        let second = coordinator
            .create_booking(Some(UserId::new("u2")), slot("10:00"))
            .await
            .unwrap();
        assert_eq!(store.slot_holder(&slot("10:00")).await.unwrap(), Some(second.id));

        let err = coordinator.approve(first.id, None, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn deciding_unknown_or_goods_order_is_not_found() {
        let (coordinator, store) = coordinator().await;

        let err = coordinator
            .approve(AggregateId::new(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let goods = OrderService::new(store)
            .place_goods_order(PlaceGoodsOrder::new(
                "u1",
                vec![LineItem::new("SKU-1", "Trowel", Money::from_minor(100), 1)],
            ))
            .await
            .unwrap();
        let err = coordinator
            .approve(goods.aggregate.id().unwrap(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn active_bookings_exclude_rejected() {
        let (coordinator, _) = coordinator().await;

        let a = coordinator.create_booking(None, slot("11:00")).await.unwrap();
        let b = coordinator.create_booking(None, slot("09:00")).await.unwrap();
        let c = coordinator.create_booking(None, slot("10:00")).await.unwrap();
        coordinator.approve(a.id, None, None).await.unwrap();
        coordinator.reject(c.id, None, None).await.unwrap();

        let active = coordinator
            .active_bookings_for_provider(&ProviderId::new("P1"))
            .await
            .unwrap();
        let ids: Vec<_> = active.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_failure() {
        let (coordinator, store) = coordinator().await;
        store.set_fail_appends(true);

        let err = coordinator
            .create_booking(None, slot("10:00"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreFailure);
        assert_eq!(store.claim_count().await, 0);
    }
}
