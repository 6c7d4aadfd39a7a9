//! Booking endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AggregateId, ProviderId, SlotKey, UserId};
use domain::Reservation;
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::resolve_order_id;
use crate::error::ApiError;
use crate::extract::{ApiJson, MaybeUser};
use crate::response::ApiResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub user_id: Option<String>,
    pub provider_id: Option<String>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub note: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingBody {
    pub booking: Reservation,
}

#[derive(Serialize)]
pub struct BookingsBody {
    pub bookings: Vec<Reservation>,
}

type BookingResponse = Json<ApiResponse<BookingBody>>;

// -- Handlers --

/// POST /bookings: request a provider slot.
#[tracing::instrument(skip(state, caller, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    MaybeUser(caller): MaybeUser,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, BookingResponse), ApiError> {
    let present = |field: Option<String>| field.filter(|value| !value.trim().is_empty());
    let (Some(provider_id), Some(date), Some(time_slot)) = (
        present(req.provider_id),
        present(req.date),
        present(req.time_slot),
    ) else {
        return Err(ApiError::BadRequest("Missing booking fields".to_string()));
    };
    let user_id = present(req.user_id).map(UserId::from).or(caller);

    let booking = state
        .bookings
        .create_booking(user_id, SlotKey::new(provider_id, date, time_slot))
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Booking request submitted", BookingBody { booking }),
    ))
}

/// PUT /bookings/{id}/approve
#[tracing::instrument(skip(state, caller, body))]
pub async fn approve<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    MaybeUser(caller): MaybeUser,
    body: Bytes,
) -> Result<BookingResponse, ApiError> {
    let id = parse_booking_id(&id)?;
    let note = decision_note(&body)?;
    let booking = state.bookings.approve(id, caller, note).await?;
    Ok(ApiResponse::ok("Booking approved", BookingBody { booking }))
}

/// PUT /bookings/{id}/reject
#[tracing::instrument(skip(state, caller, body))]
pub async fn reject<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    MaybeUser(caller): MaybeUser,
    body: Bytes,
) -> Result<BookingResponse, ApiError> {
    let id = parse_booking_id(&id)?;
    let note = decision_note(&body)?;
    let booking = state.bookings.reject(id, caller, note).await?;
    Ok(ApiResponse::ok("Booking rejected", BookingBody { booking }))
}

/// GET /bookings/user/{id}: a user's bookings, newest first.
#[tracing::instrument(skip(state))]
pub async fn for_user<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BookingsBody>>, ApiError> {
    state.catch_up().await?;
    let bookings = state.reservations.bookings_for_user(&UserId::new(id)).await;
    Ok(ApiResponse::ok("Bookings fetched", BookingsBody { bookings }))
}

/// GET /bookings/slots/{id}: slots a provider currently has taken.
#[tracing::instrument(skip(state))]
pub async fn provider_slots<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BookingsBody>>, ApiError> {
    let bookings = state
        .bookings
        .active_bookings_for_provider(&ProviderId::new(id))
        .await?;
    Ok(ApiResponse::ok("Booked slots fetched", BookingsBody { bookings }))
}

fn parse_booking_id(raw: &str) -> Result<AggregateId, ApiError> {
    resolve_order_id(raw).ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))
}

/// The decision body is optional; an empty body carries no note.
fn decision_note(body: &[u8]) -> Result<Option<String>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let req: DecisionRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?;
    Ok(req.note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_note_accepts_empty_body() {
        assert_eq!(decision_note(b"").unwrap(), None);
        assert_eq!(decision_note(b"  \n").unwrap(), None);
        assert_eq!(decision_note(b"{}").unwrap(), None);
        assert_eq!(
            decision_note(br#"{"note":"See you then"}"#).unwrap(),
            Some("See you then".to_string())
        );
        assert!(decision_note(b"not json").is_err());
    }
}
