//! HTTP error response handling for the API
//!
//! Converts domain errors to HTTP responses with appropriate status codes
//! and JSON error bodies.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Errors normally go through Error::into_response, which knows the status
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
