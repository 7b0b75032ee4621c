//! Error types for the API layer.
//!
//! [`ApiError`] renders as the standard error envelope,
//! `{"status": "error", "message": "..."}`, via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clearpath_core::DispatchError;
use clearpath_types::ResponseStatus;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A dispatcher command was rejected.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The request body could not be read as the expected JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Dispatch(DispatchError::AlreadyActive) => StatusCode::CONFLICT,
            Self::Dispatch(DispatchError::SignalNotFound(_) | DispatchError::AlertNotFound) => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "status": ResponseStatus::Error,
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
