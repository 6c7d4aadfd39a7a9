//! Success response envelope.

use axum::Json;
use serde::Serialize;

/// No payload beyond `success` and `message`.
#[derive(Debug, Serialize)]
pub struct NoData {}

/// `{ "success": true, "message": ..., ...data }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize = NoData> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

impl ApiResponse {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Self::ok(message, NoData {})
    }
}
