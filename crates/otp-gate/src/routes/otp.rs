//! OTP issuing and verification endpoints.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use otp_common::{SendOtpRequest, SendOtpResponse, VerifyOtpRequest, VerifyOtpResponse};

use super::error::ApiError;
use crate::state::AppState;

/// Issue a code to the phone number or email in the body
pub async fn send_otp(
    State(state): State<AppState>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    let Json(payload) = payload?;
    let identifier = payload.identifier()?;

    let issued = state.issuer.issue(&identifier).await?;

    Ok(Json(SendOtpResponse {
        success: true,
        message: "OTP sent successfully".to_string(),
        expires_in: issued.expires_in.as_secs(),
        expires_at: issued.expires_at,
        debug_otp: state.config.debug.then_some(issued.code),
    }))
}

/// Verify and consume a code
pub async fn verify_otp(
    State(state): State<AppState>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    let Json(payload) = payload?;
    let (identifier, code) = payload.validate()?;

    state.verifier.verify(&identifier, code).await?;

    Ok(Json(VerifyOtpResponse {
        success: true,
        message: "OTP verified successfully".to_string(),
        verified: true,
    }))
}
