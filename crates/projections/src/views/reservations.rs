//! Reservations read model, indexed by user and by provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, ProviderId, UserId};
use domain::{OrderEvent, Reservation, ReservationStatus};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, decode_order_event};
use crate::read_model::ReadModel;

#[derive(Default)]
struct ReservationsState {
    reservations: HashMap<AggregateId, Reservation>,
    by_user: HashMap<UserId, Vec<AggregateId>>,
}

/// Every booking ever requested, with its current status.
#[derive(Clone, Default)]
pub struct ReservationsView {
    state: Arc<RwLock<ReservationsState>>,
}

impl ReservationsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, reservation_id: AggregateId) -> Option<Reservation> {
        self.state
            .read()
            .await
            .reservations
            .get(&reservation_id)
            .cloned()
    }

    /// A user's bookings, newest first.
    pub async fn bookings_for_user(&self, user_id: &UserId) -> Vec<Reservation> {
        let state = self.state.read().await;
        let Some(ids) = state.by_user.get(user_id) else {
            return Vec::new();
        };
        // Oldest first in the index; the stable sort keeps newest first on ties.
        let mut bookings: Vec<Reservation> = ids
            .iter()
            .rev()
            .filter_map(|id| state.reservations.get(id).cloned())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }

    /// Pending and approved bookings of a provider, by date then slot.
    pub async fn active_for_provider(&self, provider_id: &ProviderId) -> Vec<Reservation> {
        let mut active: Vec<Reservation> = self
            .state
            .read()
            .await
            .reservations
            .values()
            .filter(|r| &r.slot.provider_id == provider_id && r.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            (&a.slot.date, &a.slot.time_slot).cmp(&(&b.slot.date, &b.slot.time_slot))
        });
        active
    }
}

#[async_trait]
impl Projection for ReservationsView {
    fn name(&self) -> &'static str {
        "ReservationsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let order_event = decode_order_event(event)?;
        let reservation_id = event.aggregate_id;

        let mut state = self.state.write().await;

        match order_event {
            Some(OrderEvent::BookingRequested(data)) => {
                if let Some(user_id) = &data.user_id {
                    state
                        .by_user
                        .entry(user_id.clone())
                        .or_default()
                        .push(reservation_id);
                }
                state.reservations.insert(
                    reservation_id,
                    Reservation {
                        id: reservation_id,
                        order_number: data.order_number,
                        user_id: data.user_id,
                        slot: data.slot,
                        status: ReservationStatus::Pending,
                        created_at: data.requested_at,
                    },
                );
            }
            Some(OrderEvent::BookingDecided(data)) => {
                if let Some(reservation) = state.reservations.get_mut(&reservation_id) {
                    reservation.status = data.decision.into();
                } else {
                    tracing::warn!(%reservation_id, "decision for unknown reservation");
                }
            }
            // Goods orders have no reservation
            Some(OrderEvent::GoodsOrderPlaced(_) | OrderEvent::GoodsStatusAdvanced(_)) | None => {}
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = ReservationsState::default();
        Ok(())
    }
}

impl ReadModel for ReservationsView {
    fn name(&self) -> &'static str {
        "ReservationsView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.reservations.len())
            .unwrap_or(0)
    }
}
