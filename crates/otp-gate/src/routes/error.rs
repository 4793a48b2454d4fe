//! Mapping of domain errors onto HTTP responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use otp_common::{ErrorResponse, OtpError};

/// Error type returned by every handler
#[derive(Debug)]
pub struct ApiError(pub OtpError);

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(OtpError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut body = ErrorResponse::from(&self.0);
        if status.is_server_error() {
            // Details stay in the logs
            tracing::error!(error = %self.0, "Request failed");
            body.error = match &self.0 {
                OtpError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
                _ => "Internal server error".to_string(),
            };
        }

        (status, Json(body)).into_response()
    }
}
