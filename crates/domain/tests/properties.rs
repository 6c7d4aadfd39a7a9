//! Property tests for slot exclusivity and the status machines.

use std::collections::HashSet;

use common::{AggregateId, SlotKey, UserId};
use domain::{
    Aggregate, BookingStatus, GoodsStatus, InMemoryProviderDirectory, LineItem, Money, Order,
    OrderError, OrderStatus, PaymentDetails, ProviderSnapshot, Reservation,
    ReservationCoordinator, ShippingAddress,
};
use event_store::InMemoryEventStore;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Book { user: u8, time: u8 },
    Approve(usize),
    Reject(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..4, 0u8..3).prop_map(|(user, time)| Op::Book { user, time }),
        1 => any::<usize>().prop_map(Op::Approve),
        1 => any::<usize>().prop_map(Op::Reject),
    ]
}

fn requested_status() -> impl Strategy<Value = String> {
    prop_oneof![
        5 => prop::sample::select(GoodsStatus::ALL.to_vec()).prop_map(|s| s.as_str().to_string()),
        1 => prop::sample::select(vec!["pending", "approved", "rejected", "Lost"])
            .prop_map(str::to_string),
    ]
}

fn slot(time: u8) -> SlotKey {
    SlotKey::new("P1", "2024-05-01", format!("{:02}:00", 9 + time))
}

fn placed_goods_order() -> Order {
    let mut order = Order::default();
    let events = order
        .place_goods(
            AggregateId::new(),
            UserId::new("u1"),
            vec![LineItem::new("SKU-1", "Trowel", Money::from_minor(100), 1)],
            PaymentDetails::default(),
            ShippingAddress::default(),
        )
        .unwrap();
    order.apply_events(events);
    order
}

fn requested_booking() -> Order {
    let mut order = Order::default();
    let events = order
        .request_booking(
            AggregateId::new(),
            Some(UserId::new("u1")),
            slot(0),
            ProviderSnapshot::default(),
        )
        .unwrap();
    order.apply_events(events);
    order
}

proptest! {
    #[test]
    fn active_reservations_never_share_a_slot(ops in prop::collection::vec(op(), 1..40)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = InMemoryEventStore::new();
            let coordinator =
                ReservationCoordinator::new(store.clone(), InMemoryProviderDirectory::new());
            let mut ids: Vec<AggregateId> = Vec::new();

            for op in ops {
                match op {
                    Op::Book { user, time } => {
                        if let Ok(reservation) = coordinator
                            .create_booking(Some(UserId::new(format!("u{user}"))), slot(time))
                            .await
                        {
                            ids.push(reservation.id);
                        }
                    }
                    Op::Approve(i) if !ids.is_empty() => {
                        let _ = coordinator.approve(ids[i % ids.len()], None, None).await;
                    }
                    Op::Reject(i) if !ids.is_empty() => {
                        let _ = coordinator.reject(ids[i % ids.len()], None, None).await;
                    }
                    _ => {}
                }

                let mut active_slots = HashSet::new();
                let mut active_count = 0;
                for id in &ids {
                    let reservation: Reservation =
                        coordinator.get_reservation(*id).await.unwrap().unwrap();
                    if reservation.is_active() {
                        active_count += 1;
                        assert!(
                            active_slots.insert(reservation.slot.clone()),
                            "two active reservations hold {}",
                            reservation.slot
                        );
                    }
                }
                assert_eq!(store.claim_count().await, active_count);
            }
        });
    }

    #[test]
    fn goods_history_is_non_decreasing(requests in prop::collection::vec(requested_status(), 0..20)) {
        let mut order = placed_goods_order();

        for requested in requests {
            let before = order.history().clone();
            match order.update_status(&requested, UserId::new("admin"), None) {
                Ok(events) => {
                    order.apply_events(events);
                    prop_assert_eq!(order.history().len(), before.len() + 1);
                }
                Err(_) => prop_assert_eq!(order.history(), &before),
            }
            prop_assert_eq!(order.history().latest().map(|e| e.status), order.status());
        }

        let indices: Vec<usize> = order
            .history()
            .iter()
            .map(|entry| match entry.status {
                OrderStatus::Goods(status) => status.index(),
                OrderStatus::Booking(_) => usize::MAX,
            })
            .collect();
        prop_assert!(indices.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn booking_accepts_one_terminal_decision(requests in prop::collection::vec(requested_status(), 0..10)) {
        let mut order = requested_booking();
        let mut decided = false;

        for requested in requests {
            let result = order.update_status(&requested, UserId::new("admin"), None);
            let acceptable = !decided && (requested == "approved" || requested == "rejected");

            match result {
                Ok(events) => {
                    prop_assert!(acceptable);
                    order.apply_events(events);
                    decided = true;
                }
                Err(err) => {
                    prop_assert!(!acceptable);
                    let expected_variant = matches!(
                        err,
                        OrderError::InvalidBookingStatus { .. }
                            | OrderError::BookingAlreadyDecided { .. }
                    );
                    prop_assert!(expected_variant);
                }
            }
        }

        let status = order.booking().unwrap().booking_status;
        prop_assert_eq!(status.is_terminal(), decided);
        prop_assert_eq!(order.history().len(), if decided { 2 } else { 1 });
        prop_assert_eq!(order.status(), Some(OrderStatus::Booking(status)));
        if !decided {
            prop_assert_eq!(status, BookingStatus::Pending);
        }
    }
}
