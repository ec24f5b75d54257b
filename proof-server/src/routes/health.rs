//! Health and status endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::state::AppState;
use crate::types::{HealthResponse, StatusResponse};

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
}

/// Health check endpoint
/// GET /health
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        queue_length: state.proof_queue_length(),
        busy: state.pipeline().is_busy(),
    };

    (StatusCode::OK, Json(response))
}

/// Detailed status endpoint
/// GET /status
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let response = StatusResponse {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        circuit: state.pipeline().config().circuit_name.clone(),
        successful_proofs: state.successful_proofs(),
        failed_proofs: state.failed_proofs(),
        queue_length: state.proof_queue_length(),
        uptime_secs: state.uptime_secs(),
        started_at: state.started_at(),
    };

    (StatusCode::OK, Json(response))
}
