//! Error responses in the Docker plugin format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rclonevol_shared::errors::VolumeError;
use rclonevol_shared::protocol::ErrorResponse;

/// Failure of a plugin endpoint, rendered as `{"Err": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    /// Request body is not valid JSON for the endpoint.
    BadRequest(String),
    /// The registry rejected the operation.
    Volume(VolumeError),
}

impl From<VolumeError> for ApiError {
    fn from(err: VolumeError) -> Self {
        ApiError::Volume(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Docker treats any non-200 status as failure and shows `Err` verbatim
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Volume(err) => {
                if err.is_caller_error() {
                    tracing::debug!(error = %err, "Request rejected");
                } else {
                    tracing::error!(error = %err, "Request failed");
                }
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
