//! API error types with HTTP response mapping.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use notifications::NotificationError;
use projections::ProjectionError;
use thiserror::Error;

use crate::config::Config;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No caller identity on a route that needs one.
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// A read model could not catch up with the log.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("{0}")]
    Internal(String),
}

/// Internal detail of a 500 response, kept out of the body unless the
/// server runs in development mode.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => match err.kind() {
                ErrorKind::Validation | ErrorKind::Conflict | ErrorKind::InvalidTransition => {
                    StatusCode::BAD_REQUEST
                }
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Notification(NotificationError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Notification(NotificationError::Storage(_))
            | ApiError::Projection(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        metrics::counter!("api_errors_total", "status" => status.as_str().to_string())
            .increment(1);

        if status.is_server_error() {
            let detail = self.to_string();
            tracing::error!(error = %detail, "internal server error");
            let body = serde_json::json!({ "success": false, "message": INTERNAL_MESSAGE });
            let mut response = (status, Json(body)).into_response();
            response.extensions_mut().insert(ErrorDetail(detail));
            return response;
        }

        let message = match &self {
            ApiError::Notification(NotificationError::NotFound(_)) => {
                "Notification not found".to_string()
            }
            other => other.to_string(),
        };
        let body = serde_json::json!({ "success": false, "message": message });
        (status, Json(body)).into_response()
    }
}

/// Adds the internal detail of a 500 response as `error` in development mode.
pub async fn expose_error_detail(State(config): State<Config>, response: Response) -> Response {
    if !config.is_development() {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };
    let mut json: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(json) => json,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    json["error"] = serde_json::Value::String(detail);

    (parts.status, Json(json)).into_response()
}
