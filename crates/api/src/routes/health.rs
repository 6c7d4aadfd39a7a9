//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use event_store::EventStore;
use projections::ReadModel;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ReadModelStatus {
    pub name: &'static str,
    pub count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionStatus {
    pub name: &'static str,
    pub events_processed: u64,
    pub streams: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub read_models: Vec<ReadModelStatus>,
    pub projections: Vec<ProjectionStatus>,
}

/// GET /health: returns system health status.
pub async fn check<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    let projections = state
        .projection_processor
        .positions()
        .await
        .into_iter()
        .map(|(name, position)| ProjectionStatus {
            name,
            events_processed: position.events_processed,
            streams: position.stream_count(),
        })
        .collect();
    let models: [&dyn ReadModel; 2] = [&state.reservations, &state.order_book];
    Json(HealthResponse {
        success: true,
        message: "Service is healthy",
        status: "ok",
        timestamp: Utc::now(),
        read_models: models
            .iter()
            .map(|model| ReadModelStatus {
                name: model.name(),
                count: model.count(),
            })
            .collect(),
        projections,
    })
}
