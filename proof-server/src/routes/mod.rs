//! HTTP Routes for the Proof Server
//!
//! Provides REST API endpoints for badge proof generation and server health.

pub mod health;
pub mod proof;

use axum::Router;

use crate::state::AppState;

/// Create all routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(proof::routes())
        .with_state(state)
}
