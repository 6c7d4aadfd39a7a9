//! Projection that tells order owners about status changes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, UserId};
use domain::{BookingStatus, GoodsStatus, OrderEvent, OrderNumber};
use event_store::EventEnvelope;
use projections::{Projection, decode_order_event};
use tokio::sync::RwLock;

use crate::dispatcher::NotificationDispatcher;
use crate::notification::NotificationCategory;

pub fn goods_status_message(order_number: &OrderNumber, status: GoodsStatus) -> String {
    format!("Your order #{order_number} has been updated to: {status}")
}

pub fn booking_decision_message(
    order_number: &OrderNumber,
    status: BookingStatus,
    note: Option<&str>,
) -> String {
    let mut message = format!("Your booking #{order_number} has been {status}.");
    if let Some(note) = note {
        message.push_str(" Message: ");
        message.push_str(note);
    }
    message
}

struct Recipient {
    order_number: OrderNumber,
    user_id: Option<UserId>,
}

#[derive(Default)]
struct NotifierState {
    recipients: HashMap<AggregateId, Recipient>,
}

/// Sends one notification per accepted status change.
///
/// Runs over the committed log, so a status change is never held up or
/// undone by the sink. Delivery is at most once: a failed notification is
/// not retried.
#[derive(Clone)]
pub struct StatusChangeNotifier {
    dispatcher: NotificationDispatcher,
    state: Arc<RwLock<NotifierState>>,
}

impl StatusChangeNotifier {
    pub fn new(dispatcher: NotificationDispatcher) -> Self {
        Self {
            dispatcher,
            state: Arc::default(),
        }
    }

    /// Builds the message for a status event, if its order has an owner.
    async fn message_for(
        &self,
        order_id: AggregateId,
        event: OrderEvent,
    ) -> Option<(UserId, String)> {
        let mut state = self.state.write().await;

        match event {
            OrderEvent::GoodsOrderPlaced(data) => {
                state.recipients.insert(
                    order_id,
                    Recipient {
                        order_number: data.order_number,
                        user_id: Some(data.user_id),
                    },
                );
                None
            }
            OrderEvent::BookingRequested(data) => {
                state.recipients.insert(
                    order_id,
                    Recipient {
                        order_number: data.order_number,
                        user_id: data.user_id,
                    },
                );
                None
            }
            OrderEvent::GoodsStatusAdvanced(data) => {
                let recipient = state.recipients.get(&order_id)?;
                Some((
                    recipient.user_id.clone()?,
                    goods_status_message(&recipient.order_number, data.to),
                ))
            }
            OrderEvent::BookingDecided(data) => {
                let recipient = state.recipients.get(&order_id)?;
                Some((
                    recipient.user_id.clone()?,
                    booking_decision_message(
                        &recipient.order_number,
                        data.decision.into(),
                        data.note.as_deref(),
                    ),
                ))
            }
        }
    }
}

#[async_trait]
impl Projection for StatusChangeNotifier {
    fn name(&self) -> &'static str {
        "StatusChangeNotifier"
    }

    async fn handle(&self, event: &EventEnvelope) -> projections::Result<()> {
        if let Some(order_event) = decode_order_event(event)?
            && let Some((user_id, message)) =
                self.message_for(event.aggregate_id, order_event).await
        {
            self.dispatcher
                .notify(
                    &user_id,
                    message,
                    NotificationCategory::OrderStatus,
                    Some(event.aggregate_id),
                )
                .await;
        }
        Ok(())
    }

    /// Forgets recipients. Notifications already sent stay sent,
    /// so replaying the log after a reset sends them again.
    async fn reset(&self) -> projections::Result<()> {
        *self.state.write().await = NotifierState::default();
        Ok(())
    }
}
