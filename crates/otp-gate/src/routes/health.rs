//! Liveness and health endpoints.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
    version: &'static str,
}

/// Static liveness payload
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "OTP Service is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: String,
}

/// Store connectivity check.
///
/// Always answers 200; an unreachable store is reported as `unhealthy`.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = state.store.backend();

    if state.store_healthy().await {
        Json(HealthResponse {
            status: "healthy",
            database: format!("{backend}_connected"),
        })
    } else {
        Json(HealthResponse {
            status: "unhealthy",
            database: format!("{backend}_disconnected"),
        })
    }
}
