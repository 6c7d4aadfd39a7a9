//! Order book read model: every order with its history, for listings and
//! search.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{
    Aggregate, AuditLog, BookingOrder, GoodsOrder, Order, OrderEvent, OrderNumber, OrderStatus,
    OrderType,
};
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, decode_order_event};
use crate::read_model::ReadModel;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

/// Wire shape of an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: AggregateId,
    pub order_id: OrderNumber,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goods: Option<GoodsOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingOrder>,
    pub status_history: AuditLog,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderSummary {
    /// Summarizes a created order. Returns `None` before its first event.
    pub fn from_order(order: &Order) -> Option<Self> {
        let created_at = order.created_at()?;
        Some(Self {
            id: order.id()?,
            order_id: order.order_number()?,
            order_type: order.order_type()?,
            user_id: order.user_id().cloned(),
            status: order.status()?,
            progress_percentage: order.progress_percentage(),
            goods: order.goods().cloned(),
            booking: order.booking().cloned(),
            status_history: order.history().clone(),
            created_at,
            updated_at: order
                .history()
                .latest()
                .map(|entry| entry.updated_at)
                .unwrap_or(created_at),
        })
    }

    fn matches(&self, query: &OrderQuery) -> bool {
        if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty())
            && self.status.as_str() != status
        {
            return false;
        }
        if query.start_date.is_some_and(|start| self.created_at < start)
            || query.end_date.is_some_and(|end| self.created_at > end)
        {
            return false;
        }
        match query.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => true,
            Some(text) => {
                let needle = text.to_lowercase();
                self.order_id.to_string().to_lowercase().contains(&needle)
                    || self.goods.as_ref().is_some_and(|goods| {
                        goods
                            .items
                            .iter()
                            .any(|item| item.name.to_lowercase().contains(&needle))
                    })
            }
        }
    }
}

/// Filters for [`OrderBookView::search`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    /// Case-insensitive match on the order number or an item name.
    pub query: Option<String>,
    /// Exact status, e.g. `Shipped` or `approved`.
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// 1-based.
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub pages: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPage {
    pub orders: Vec<OrderSummary>,
    pub pagination: Pagination,
}

#[derive(Default)]
struct OrderBookState {
    orders: HashMap<AggregateId, Order>,
    /// Order ids in delivery order of their first event.
    created: Vec<AggregateId>,
    by_user: HashMap<UserId, Vec<AggregateId>>,
}

impl OrderBookState {
    /// Ids are given oldest first; ties on `created_at` keep newest first.
    fn summaries<'a>(
        &self,
        ids: impl DoubleEndedIterator<Item = &'a AggregateId>,
    ) -> Vec<OrderSummary> {
        let mut summaries: Vec<OrderSummary> = ids
            .rev()
            .filter_map(|id| self.orders.get(id))
            .filter_map(OrderSummary::from_order)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }
}

/// All orders of both kinds, replayed from their streams.
#[derive(Clone, Default)]
pub struct OrderBookView {
    state: Arc<RwLock<OrderBookState>>,
}

impl OrderBookView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: AggregateId) -> Option<OrderSummary> {
        self.state
            .read()
            .await
            .orders
            .get(&order_id)
            .and_then(OrderSummary::from_order)
    }

    /// Every order, newest first.
    pub async fn all(&self) -> Vec<OrderSummary> {
        let state = self.state.read().await;
        state.summaries(state.created.iter())
    }

    /// A user's orders of both kinds, newest first.
    pub async fn history_for_user(&self, user_id: &UserId) -> Vec<OrderSummary> {
        let state = self.state.read().await;
        match state.by_user.get(user_id) {
            Some(ids) => state.summaries(ids.iter()),
            None => Vec::new(),
        }
    }

    /// Filters all orders and returns one page, newest first.
    pub async fn search(&self, query: &OrderQuery) -> OrderPage {
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        let page = query.page.filter(|p| *p > 0).unwrap_or(1);

        let matching: Vec<OrderSummary> = self
            .all()
            .await
            .into_iter()
            .filter(|summary| summary.matches(query))
            .collect();
        let total = matching.len();

        OrderPage {
            orders: matching
                .into_iter()
                .skip((page - 1).saturating_mul(limit))
                .take(limit)
                .collect(),
            pagination: Pagination {
                total,
                page,
                pages: total.div_ceil(limit),
                limit,
            },
        }
    }
}

#[async_trait]
impl Projection for OrderBookView {
    fn name(&self) -> &'static str {
        "OrderBookView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let order_event = decode_order_event(event)?;
        let order_id = event.aggregate_id;

        let mut state = self.state.write().await;

        if let Some(order_event) = order_event {
            let creates = matches!(
                order_event,
                OrderEvent::GoodsOrderPlaced(_) | OrderEvent::BookingRequested(_)
            );

            if creates {
                let mut order = Order::default();
                order.apply(order_event);
                order.set_version(event.version);
                if let Some(user_id) = order.user_id() {
                    state
                        .by_user
                        .entry(user_id.clone())
                        .or_default()
                        .push(order_id);
                }
                state.created.push(order_id);
                state.orders.insert(order_id, order);
            } else if let Some(order) = state.orders.get_mut(&order_id) {
                order.apply(order_event);
                order.set_version(event.version);
            } else {
                tracing::warn!(%order_id, event_type = %event.event_type, "event for unknown order");
            }
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = OrderBookState::default();
        Ok(())
    }
}

impl ReadModel for OrderBookView {
    fn name(&self) -> &'static str {
        "OrderBookView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.orders.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SlotKey;
    use domain::{
        BookingDecision, BookingStatus, DomainEvent, GoodsStatus, LineItem, Money, ProviderSnapshot,
    };
    use event_store::Version;

    fn make_envelope(aggregate_id: AggregateId, version: i64, event: &OrderEvent) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Order")
            .event_type(event.event_type())
            .version(Version::new(version))
            .payload(event)
            .unwrap()
            .build()
            .unwrap()
    }

    async fn place(view: &OrderBookView, user: &str, item: &str) -> AggregateId {
        let id = AggregateId::new();
        let event = OrderEvent::goods_order_placed(
            OrderNumber::new(OrderType::Goods, id),
            UserId::new(user),
            vec![LineItem::new("SKU-1", item, Money::from_minor(500), 2)],
            Default::default(),
            Default::default(),
        );
        view.handle(&make_envelope(id, 1, &event)).await.unwrap();
        id
    }

    async fn advance(view: &OrderBookView, id: AggregateId, version: i64, to: GoodsStatus) {
        let event = OrderEvent::goods_status_advanced(
            GoodsStatus::OrderPlaced,
            to,
            UserId::new("admin"),
            None,
        );
        view.handle(&make_envelope(id, version, &event))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn goods_order_summary() {
        let view = OrderBookView::new();
        let id = place(&view, "u1", "Trowel").await;
        advance(&view, id, 2, GoodsStatus::Shipped).await;

        let summary = view.get(id).await.unwrap();
        assert_eq!(summary.order_type, OrderType::Goods);
        assert_eq!(summary.status, OrderStatus::Goods(GoodsStatus::Shipped));
        assert_eq!(summary.status_history.len(), 2);
        assert_eq!(summary.progress_percentage, Some(60));
        assert_eq!(summary.goods.unwrap().total_amount, Money::from_minor(1000));
        assert!(summary.updated_at >= summary.created_at);
    }

    #[tokio::test]
    async fn booking_order_summary_serializes_camel_case() {
        let view = OrderBookView::new();
        let id = AggregateId::new();
        let slot = SlotKey::new("P1", "2024-05-01", "10:00");
        let requested = OrderEvent::booking_requested(
            OrderNumber::new(OrderType::Booking, id),
            Some(UserId::new("u1")),
            slot.clone(),
            ProviderSnapshot::default(),
        );
        let decided = OrderEvent::booking_decided(BookingDecision::Approved, slot, None, None);
        view.handle(&make_envelope(id, 1, &requested)).await.unwrap();
        view.handle(&make_envelope(id, 2, &decided)).await.unwrap();

        let summary = view.get(id).await.unwrap();
        assert_eq!(summary.status, OrderStatus::Booking(BookingStatus::Approved));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["type"], "booking");
        assert_eq!(json["status"], "approved");
        assert_eq!(json["booking"]["timeSlot"], "10:00");
        assert_eq!(json["statusHistory"].as_array().unwrap().len(), 2);
        assert!(json.get("goods").is_none());
        assert!(json.get("progressPercentage").is_none());
    }

    #[tokio::test]
    async fn listings_are_newest_first() {
        let view = OrderBookView::new();
        let first = place(&view, "u1", "Trowel").await;
        let second = place(&view, "u2", "Seeds").await;
        let third = place(&view, "u1", "Hose").await;

        let all: Vec<_> = view.all().await.iter().map(|o| o.id).collect();
        assert_eq!(all, vec![third, second, first]);

        let mine: Vec<_> = view
            .history_for_user(&UserId::new("u1"))
            .await
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(mine, vec![third, first]);
    }

    #[tokio::test]
    async fn search_filters_and_paginates() {
        let view = OrderBookView::new();
        let trowel = place(&view, "u1", "Steel Trowel").await;
        for i in 0..12 {
            place(&view, "u2", &format!("Seed pack {i}")).await;
        }
        advance(&view, trowel, 2, GoodsStatus::Delivered).await;

        let by_item = view
            .search(&OrderQuery {
                query: Some("trowel".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(by_item.pagination.total, 1);
        assert_eq!(by_item.orders[0].id, trowel);

        let by_number = view
            .search(&OrderQuery {
                query: Some(trowel.to_string()[..8].to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(by_number.orders[0].id, trowel);

        let delivered = view
            .search(&OrderQuery {
                status: Some("Delivered".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(delivered.pagination.total, 1);

        let page = view
            .search(&OrderQuery {
                query: Some("seed".to_string()),
                page: Some(2),
                ..Default::default()
            })
            .await;
        assert_eq!(
            page.pagination,
            Pagination {
                total: 12,
                page: 2,
                pages: 2,
                limit: 10
            }
        );
        assert_eq!(page.orders.len(), 2);
    }

    #[tokio::test]
    async fn events_for_unknown_orders_are_skipped() {
        let view = OrderBookView::new();
        advance(&view, AggregateId::new(), 2, GoodsStatus::Shipped).await;

        assert_eq!(view.count(), 0);
    }

    #[tokio::test]
    async fn reset_clears_orders() {
        let view = OrderBookView::new();
        place(&view, "u1", "Trowel").await;

        view.reset().await.unwrap();

        assert!(view.all().await.is_empty());
    }
}
