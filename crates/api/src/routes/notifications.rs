//! Notification inbox endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::UserId;
use event_store::EventStore;
use notifications::{Notification, NotificationId, NotificationList};
use serde::Serialize;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct NotificationBody {
    pub notification: Notification,
}

#[derive(Serialize)]
pub struct UpdatedBody {
    pub updated: usize,
}

/// GET /notifications/{id}: a user's newest notifications.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NotificationList>>, ApiError> {
    // Status notifications are written by a projection.
    state.catch_up().await?;
    let list = state.notifications.list(&UserId::new(id)).await?;
    Ok(ApiResponse::ok("Notifications fetched", list))
}

/// PUT /notifications/{id}/read
#[tracing::instrument(skip(state))]
pub async fn mark_read<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NotificationBody>>, ApiError> {
    let notification = state.notifications.mark_read(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(
        "Notification marked as read",
        NotificationBody { notification },
    ))
}

/// PUT /notifications/{id}/read-all, where `id` is the user.
#[tracing::instrument(skip(state))]
pub async fn mark_all_read<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UpdatedBody>>, ApiError> {
    let updated = state
        .notifications
        .mark_all_read(&UserId::new(id))
        .await?;
    Ok(ApiResponse::ok(
        "All notifications marked as read",
        UpdatedBody { updated },
    ))
}

/// DELETE /notifications/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    state.notifications.delete(parse_id(&id)?).await?;
    Ok(ApiResponse::message("Notification deleted"))
}

fn parse_id(raw: &str) -> Result<NotificationId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("Notification not found".to_string()))
}
