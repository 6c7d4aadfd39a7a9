//! Order service: the status transition entry point.

use common::AggregateId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{DecideBooking, Order, PlaceGoodsOrder, RequestBooking, UpdateOrderStatus};

/// High-level API over the order command handler.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Places a goods order in status `Order Placed`.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, user_id = %cmd.user_id))]
    pub async fn place_goods_order(
        &self,
        cmd: PlaceGoodsOrder,
    ) -> Result<CommandResult<Order>, DomainError> {
        let order_id = cmd.order_id;
        let result = self
            .handler
            .execute(order_id, |order| {
                order.place_goods(
                    order_id,
                    cmd.user_id,
                    cmd.items,
                    cmd.payment,
                    cmd.shipping_address,
                )
            })
            .await?;

        metrics::counter!("orders_placed_total", "type" => "goods").increment(1);
        tracing::info!("goods order placed");
        Ok(result)
    }

    /// Opens a booking stream. The append claims the slot atomically.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, slot = %cmd.slot))]
    pub async fn request_booking(
        &self,
        cmd: RequestBooking,
    ) -> Result<CommandResult<Order>, DomainError> {
        let order_id = cmd.order_id;
        self.handler
            .execute(order_id, |order| {
                order.request_booking(order_id, cmd.user_id, cmd.slot, cmd.provider)
            })
            .await
    }

    /// Applies a requested status change according to the order's kind.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, status = %cmd.status))]
    pub async fn update_status(
        &self,
        cmd: UpdateOrderStatus,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .handler
            .execute(cmd.order_id, |order| {
                order.update_status(&cmd.status, cmd.actor, cmd.note)
            })
            .await?;

        Self::record_transition(&result.aggregate);
        Ok(result)
    }

    /// Approves or rejects a pending booking.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, decision = %cmd.decision))]
    pub async fn decide_booking(
        &self,
        cmd: DecideBooking,
    ) -> Result<CommandResult<Order>, DomainError> {
        let result = self
            .handler
            .execute(cmd.order_id, |order| {
                order.decide(cmd.decision, cmd.actor, cmd.note)
            })
            .await?;

        Self::record_transition(&result.aggregate);
        Ok(result)
    }

    /// Loads an order by id. Returns None if it doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    fn record_transition(order: &Order) {
        let (Some(order_type), Some(status)) = (order.order_type(), order.status()) else {
            return;
        };
        let order_type = match order_type {
            super::OrderType::Goods => "goods",
            super::OrderType::Booking => "booking",
        };
        metrics::counter!(
            "order_status_transitions_total",
            "type" => order_type,
            "status" => status.as_str()
        )
        .increment(1);
        tracing::info!(%status, "order status changed");
    }
}
