//! Badge proof and commitment endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::services::CommitmentError;
use crate::state::AppState;
use crate::types::{
    CommitmentRequest, CommitmentResponse, ErrorCode, ErrorResponse, GenerateProofRequest,
    ProofRequest,
};

/// Create proof routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/generate-proof", post(generate_proof))
        .route("/api/v1/proof/generate", post(generate_proof))
        .route("/api/v1/commitment", post(compute_commitment))
}

fn error_body(status: StatusCode, code: ErrorCode, message: String) -> (StatusCode, Json<Value>) {
    let body = ErrorResponse {
        code,
        message,
        details: None,
    };
    (
        status,
        Json(serde_json::to_value(body).unwrap_or(Value::Null)),
    )
}

fn commitment_failure(e: CommitmentError) -> (StatusCode, Json<Value>) {
    match e {
        CommitmentError::Hash(_) => {
            error!(error = %e, "Commitment hashing failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::CommitmentFailed,
                e.to_string(),
            )
        }
        _ => error_body(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, e.to_string()),
    }
}

/// Generate a badge proof
/// POST /api/generate-proof, POST /api/v1/proof/generate
#[instrument(skip(state, payload))]
async fn generate_proof(
    State(state): State<AppState>,
    payload: Result<Json<GenerateProofRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected proof request body");
            return error_body(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidInput,
                format!("Invalid request: {}", rejection.body_text()),
            );
        }
    };

    let request_id = uuid::Uuid::new_v4().to_string();
    info!(
        %request_id,
        donation_amount = %request.donation_amount,
        threshold = %request.threshold,
        badge_tier = %request.badge_tier,
        "Received badge proof request"
    );

    let donation_commitment = match request.donation_commitment {
        Some(commitment) => commitment,
        None => match state
            .hasher()
            .commit(&request.donor_secret, &request.donation_amount)
        {
            Ok(commitment) => commitment,
            Err(e) => return commitment_failure(e),
        },
    };

    let proof_request = ProofRequest {
        donation_amount: request.donation_amount,
        donor_secret: request.donor_secret,
        threshold: request.threshold,
        badge_tier: request.badge_tier,
        donation_commitment,
    };
    if let Err(message) = proof_request.validate() {
        return error_body(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, message);
    }

    let ticket = state.enqueue_proof(request_id);
    let response = state.pipeline().generate(&proof_request).await;
    drop(ticket);
    state.record_result(response.success);

    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(serde_json::to_value(response).unwrap_or(Value::Null)),
    )
}

/// Compute a donation commitment without proving
/// POST /api/v1/commitment
async fn compute_commitment(
    State(state): State<AppState>,
    payload: Result<Json<CommitmentRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            return error_body(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidInput,
                format!("Invalid request: {}", rejection.body_text()),
            )
        }
    };

    match state
        .hasher()
        .commit(&request.donor_secret, &request.donation_amount)
    {
        Ok(commitment) => (
            StatusCode::OK,
            Json(serde_json::to_value(CommitmentResponse { commitment }).unwrap_or(Value::Null)),
        ),
        Err(e) => commitment_failure(e),
    }
}
