//! The JSON reply envelope shared by every endpoint.
//!
//! ```json
//! {"status": "success", "message": "Emergency mode activated", "data": { ... }}
//! ```
//!
//! `message` and `data` are omitted when empty. Errors use the same shape
//! and are produced by [`ApiError`](crate::error::ApiError).

use axum::Json;
use axum::response::{IntoResponse, Response};
use clearpath_types::ResponseStatus;
use serde::Serialize;

/// A successful reply.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// Always [`ResponseStatus::Success`].
    pub status: ResponseStatus,
    /// Human-readable outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A reply carrying only data.
    pub const fn data(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            data: Some(data),
        }
    }

    /// A reply carrying a message and data.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
