//! Cheque lifecycle routes. One route per action, all through the orchestrator.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::post,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tesoro_db::{ChequeCommand, ChequeRequest};
use tesoro_shared::types::{AccountId, ChequeId};

use crate::error::ApiError;
use crate::extractors::IdempotencyHeader;
use crate::middleware::AuthUser;
use crate::response::idempotent;
use crate::AppState;

/// Creates the cheque routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cheques/{cheque_id}/deposit", post(deposit))
        .route("/cheques/{cheque_id}/clear", post(clear))
        .route("/cheques/{cheque_id}/bounce", post(bounce))
        .route("/cheques/{cheque_id}/endorse", post(endorse))
        .route("/cheques/{cheque_id}/void", post(void))
        .route("/cheques/{cheque_id}/renegotiate", post(renegotiate))
}

/// Request body for a deposit.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Bank account receiving the funds.
    pub account_id: Option<AccountId>,
    /// Value date; today when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Request body for actions that need a reason.
#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    /// Free-text reason.
    #[serde(default)]
    pub reason: String,
}

/// Request body for an endorsement.
#[derive(Debug, Deserialize)]
pub struct EndorseRequest {
    /// Who receives the cheque.
    #[serde(default)]
    pub endorsee: String,
}

async fn apply(
    state: &AppState,
    auth: &AuthUser,
    key: IdempotencyHeader,
    cheque_id: ChequeId,
    request: ChequeRequest,
) -> Result<Response, ApiError> {
    let command = ChequeCommand { cheque_id, request };
    let outcome = state.orchestrator.run(&auth.context(key.0), &command).await?;

    if let Some(movement) = &outcome.value.movement {
        state
            .balance_cache
            .invalidate(&(auth.organization_id(), movement.account_id));
    }

    Ok(idempotent(StatusCode::OK, outcome))
}

/// POST `/cheques/{cheque_id}/deposit`
async fn deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    key: IdempotencyHeader,
    Path(cheque_id): Path<ChequeId>,
    Json(payload): Json<DepositRequest>,
) -> Result<Response, ApiError> {
    let request = ChequeRequest::Deposit {
        account_id: payload.account_id,
        date: payload.date,
    };
    apply(&state, &auth, key, cheque_id, request).await
}

/// POST `/cheques/{cheque_id}/clear`
async fn clear(
    State(state): State<AppState>,
    auth: AuthUser,
    key: IdempotencyHeader,
    Path(cheque_id): Path<ChequeId>,
) -> Result<Response, ApiError> {
    apply(&state, &auth, key, cheque_id, ChequeRequest::Clear).await
}

/// POST `/cheques/{cheque_id}/bounce`
async fn bounce(
    State(state): State<AppState>,
    auth: AuthUser,
    key: IdempotencyHeader,
    Path(cheque_id): Path<ChequeId>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Response, ApiError> {
    let request = ChequeRequest::Bounce { reason: payload.reason };
    apply(&state, &auth, key, cheque_id, request).await
}

/// POST `/cheques/{cheque_id}/endorse`
async fn endorse(
    State(state): State<AppState>,
    auth: AuthUser,
    key: IdempotencyHeader,
    Path(cheque_id): Path<ChequeId>,
    Json(payload): Json<EndorseRequest>,
) -> Result<Response, ApiError> {
    let request = ChequeRequest::Endorse {
        endorsee: payload.endorsee,
    };
    apply(&state, &auth, key, cheque_id, request).await
}

/// POST `/cheques/{cheque_id}/void`
async fn void(
    State(state): State<AppState>,
    auth: AuthUser,
    key: IdempotencyHeader,
    Path(cheque_id): Path<ChequeId>,
    Json(payload): Json<ReasonRequest>,
) -> Result<Response, ApiError> {
    let request = ChequeRequest::Void { reason: payload.reason };
    apply(&state, &auth, key, cheque_id, request).await
}

/// POST `/cheques/{cheque_id}/renegotiate`
async fn renegotiate(
    State(state): State<AppState>,
    auth: AuthUser,
    key: IdempotencyHeader,
    Path(cheque_id): Path<ChequeId>,
) -> Result<Response, ApiError> {
    apply(&state, &auth, key, cheque_id, ChequeRequest::Renegotiate).await
}
