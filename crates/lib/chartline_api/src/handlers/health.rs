//! Health endpoint: liveness plus the configured provider.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
}

/// `GET /api/health`: reports the crate version and active provider.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: chartline_core::version(),
        provider: state.model.name().to_string(),
    })
}
