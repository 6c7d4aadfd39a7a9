//! Shared application state.

use std::sync::Arc;

use domain::{OrderService, ProviderDirectory, ReservationCoordinator};
use event_store::EventStore;
use notifications::NotificationDispatcher;
use projections::{OrderBookView, ProjectionProcessor, ReservationsView};

use crate::config::Config;
use crate::directory::UserDirectory;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore + Clone> {
    pub orders: OrderService<S>,
    pub bookings: ReservationCoordinator<S, Arc<dyn ProviderDirectory>>,
    pub providers: Arc<dyn ProviderDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub notifications: NotificationDispatcher,
    pub reservations: ReservationsView,
    pub order_book: OrderBookView,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
    pub config: Config,
}

impl<S: EventStore + Clone> AppState<S> {
    /// Brings the read models up to the end of the log before a query.
    pub async fn catch_up(&self) -> Result<(), ApiError> {
        self.projection_processor.run_catch_up().await?;
        Ok(())
    }
}
