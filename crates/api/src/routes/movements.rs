//! Movement reversal.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::post,
};
use serde::Deserialize;
use tesoro_db::ReverseMovement;
use tesoro_shared::types::MovementId;

use crate::error::ApiError;
use crate::extractors::IdempotencyHeader;
use crate::middleware::AuthUser;
use crate::response::idempotent;
use crate::AppState;

/// Creates the movement routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/movements/{movement_id}/reverse", post(reverse_movement))
}

/// Request body for a reversal.
#[derive(Debug, Deserialize)]
pub struct ReverseMovementRequest {
    /// Why the movement is undone.
    #[serde(default)]
    pub reason: String,
}

/// POST `/movements/{movement_id}/reverse`
async fn reverse_movement(
    State(state): State<AppState>,
    auth: AuthUser,
    IdempotencyHeader(key): IdempotencyHeader,
    Path(movement_id): Path<MovementId>,
    Json(payload): Json<ReverseMovementRequest>,
) -> Result<Response, ApiError> {
    let step = ReverseMovement {
        movement_id,
        reason: payload.reason,
    };

    let outcome = state.orchestrator.run(&auth.context(key), &step).await?;
    state
        .balance_cache
        .invalidate(&(auth.organization_id(), outcome.value.account_id));

    Ok(idempotent(StatusCode::CREATED, outcome))
}
