//! Integration tests: order and booking commands → ProjectionProcessor → views.

use common::{ProviderId, SlotKey, UserId};
use domain::{
    BookingStatus, GoodsStatus, InMemoryProviderDirectory, LineItem, Money, OrderService,
    OrderStatus, PlaceGoodsOrder, ReservationCoordinator, ReservationStatus, UpdateOrderStatus,
    Aggregate,
};
use event_store::InMemoryEventStore;
use projections::{OrderBookView, OrderQuery, ProjectionProcessor, ReservationsView};

struct Harness {
    orders: OrderService<InMemoryEventStore>,
    bookings: ReservationCoordinator<InMemoryEventStore, InMemoryProviderDirectory>,
    processor: ProjectionProcessor<InMemoryEventStore>,
    reservations: ReservationsView,
    order_book: OrderBookView,
}

fn setup() -> Harness {
    let store = InMemoryEventStore::new();
    let reservations = ReservationsView::new();
    let order_book = OrderBookView::new();

    let mut processor = ProjectionProcessor::new(store.clone());
    processor.register(Box::new(reservations.clone()));
    processor.register(Box::new(order_book.clone()));

    Harness {
        orders: OrderService::new(store.clone()),
        bookings: ReservationCoordinator::new(store, InMemoryProviderDirectory::new()),
        processor,
        reservations,
        order_book,
    }
}

fn slot(time: &str) -> SlotKey {
    SlotKey::new("P1", "2024-05-01", time)
}

#[tokio::test]
async fn booking_lifecycle_reaches_both_views() {
    let h = setup();

    let reservation = h
        .bookings
        .create_booking(Some(UserId::new("u1")), slot("10:00"))
        .await
        .unwrap();
    h.bookings
        .create_booking(Some(UserId::new("u2")), slot("10:00"))
        .await
        .unwrap_err();
    h.bookings
        .approve(reservation.id, Some(UserId::new("admin")), None)
        .await
        .unwrap();

    h.processor.run_catch_up().await.unwrap();

    let projected = h.reservations.get(reservation.id).await.unwrap();
    assert_eq!(projected.status, ReservationStatus::Approved);
    assert_eq!(projected.order_number, reservation.order_number);

    let order = h.order_book.get(reservation.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Booking(BookingStatus::Approved));
    assert_eq!(order.status_history.len(), 2);

    assert_eq!(
        h.reservations.bookings_for_user(&UserId::new("u1")).await.len(),
        1
    );
    assert!(
        h.reservations
            .bookings_for_user(&UserId::new("u2"))
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn projected_slots_agree_with_claim_index() {
    let h = setup();

    let mut ids = Vec::new();
    for time in ["09:00", "10:00", "11:00", "12:00"] {
        ids.push(
            h.bookings
                .create_booking(None, slot(time))
                .await
                .unwrap()
                .id,
        );
    }
    h.bookings.reject(ids[1], None, None).await.unwrap();
    h.bookings.approve(ids[2], None, None).await.unwrap();
    h.bookings.create_booking(None, slot("10:00")).await.unwrap();

    h.processor.run_catch_up().await.unwrap();

    let provider = ProviderId::new("P1");
    let from_view: Vec<_> = h
        .reservations
        .active_for_provider(&provider)
        .await
        .into_iter()
        .map(|r| r.id)
        .collect();
    let from_claims: Vec<_> = h
        .bookings
        .active_bookings_for_provider(&provider)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();

    assert_eq!(from_view.len(), 4);
    assert_eq!(from_view, from_claims);
}

#[tokio::test]
async fn goods_history_and_search() {
    let h = setup();

    let placed = h
        .orders
        .place_goods_order(PlaceGoodsOrder::new(
            "u1",
            vec![LineItem::new("SKU-1", "Steel Trowel", Money::from_minor(1500), 1)],
        ))
        .await
        .unwrap();
    let order_id = placed.aggregate.id().unwrap();

    h.orders
        .update_status(UpdateOrderStatus::new(order_id, "Shipped", "admin"))
        .await
        .unwrap();
    h.orders
        .update_status(UpdateOrderStatus::new(order_id, "Processing", "admin"))
        .await
        .unwrap_err();

    h.bookings
        .create_booking(Some(UserId::new("u1")), slot("10:00"))
        .await
        .unwrap();

    h.processor.run_catch_up().await.unwrap();

    let history = h.order_book.history_for_user(&UserId::new("u1")).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].id, order_id);
    assert_eq!(history[1].status, OrderStatus::Goods(GoodsStatus::Shipped));
    assert_eq!(history[1].status_history.len(), 2);

    let found = h
        .order_book
        .search(&OrderQuery {
            query: Some("TROWEL".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(found.pagination.total, 1);
    assert_eq!(found.orders[0].id, order_id);

    let pending = h
        .order_book
        .search(&OrderQuery {
            status: Some("pending".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(pending.pagination.total, 1);
}

#[tokio::test]
async fn incremental_catch_up_and_rebuild_agree() {
    let h = setup();

    for i in 0..5 {
        h.orders
            .place_goods_order(PlaceGoodsOrder::new(
                format!("u{i}"),
                vec![LineItem::new("SKU-1", "Seeds", Money::from_minor(100), 1)],
            ))
            .await
            .unwrap();
        h.processor.run_catch_up().await.unwrap();
    }
    let incremental: Vec<_> = h.order_book.all().await.into_iter().map(|o| o.id).collect();

    h.processor.rebuild_all().await.unwrap();
    let rebuilt: Vec<_> = h.order_book.all().await.into_iter().map(|o| o.id).collect();

    assert_eq!(incremental.len(), 5);
    assert_eq!(incremental, rebuilt);
}
