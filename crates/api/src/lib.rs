//! HTTP API for the marketplace order and booking engine.
//!
//! Bookings, goods orders, status changes, listings and notification
//! inboxes over one event log, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod directory;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use domain::{InMemoryProviderDirectory, OrderService, ProviderDirectory, ReservationCoordinator};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{
    InMemoryNotificationSink, NotificationDispatcher, NotificationSink, StatusChangeNotifier,
};
use projections::{OrderBookView, ProjectionProcessor, ReservationsView};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use directory::{InMemoryUserDirectory, UserDirectory};
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let config = state.config.clone();

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        // Bookings
        .route("/bookings", post(routes::bookings::create::<S>))
        .route("/bookings/{id}/approve", put(routes::bookings::approve::<S>))
        .route("/bookings/{id}/reject", put(routes::bookings::reject::<S>))
        .route("/bookings/user/{id}", get(routes::bookings::for_user::<S>))
        .route(
            "/bookings/slots/{id}",
            get(routes::bookings::provider_slots::<S>),
        )
        // Orders
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/search", get(routes::orders::search::<S>))
        .route("/orders/history", get(routes::orders::history::<S>))
        .route(
            "/orders/{id}/status",
            get(routes::orders::status::<S>).put(routes::orders::update_status::<S>),
        )
        // Notifications
        .route(
            "/notifications/{id}",
            get(routes::notifications::list::<S>).delete(routes::notifications::delete::<S>),
        )
        .route(
            "/notifications/{id}/read",
            put(routes::notifications::mark_read::<S>),
        )
        .route(
            "/notifications/{id}/read-all",
            put(routes::notifications::mark_all_read::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(middleware::map_response_with_state(
            config,
            error::expose_error_detail,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires services, read models and the status notifier over one store.
///
/// The returned state owns the projection processor; the caller decides
/// whether to also run it on a timer.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: Config,
    providers: Arc<dyn ProviderDirectory>,
    users: Arc<dyn UserDirectory>,
    sink: impl NotificationSink + 'static,
) -> Arc<AppState<S>> {
    let notifications = NotificationDispatcher::new(sink);
    let reservations = ReservationsView::new();
    let order_book = OrderBookView::new();

    let processor = ProjectionProcessor::new(event_store.clone())
        .with(reservations.clone())
        .with(order_book.clone())
        .with(StatusChangeNotifier::new(notifications.clone()));

    Arc::new(AppState {
        orders: OrderService::new(event_store.clone()),
        bookings: ReservationCoordinator::new(event_store, providers.clone()),
        providers,
        users,
        notifications,
        reservations,
        order_book,
        projection_processor: Arc::new(processor),
        config,
    })
}

/// Creates the application state with in-memory directories and sink.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: Config,
) -> Arc<AppState<S>> {
    create_state(
        event_store,
        config,
        Arc::new(InMemoryProviderDirectory::new()),
        Arc::new(InMemoryUserDirectory::new()),
        InMemoryNotificationSink::new(),
    )
}
