//! Account routes: manual movements, balance, history and reconciliation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tesoro_core::OperationError;
use tesoro_core::ledger::{Direction, MovementReference};
use tesoro_db::CreateMovement;
use tesoro_shared::types::{AccountId, PageRequest};
use tracing::{debug, error};

use crate::error::ApiError;
use crate::extractors::IdempotencyHeader;
use crate::middleware::AuthUser;
use crate::response::idempotent;
use crate::AppState;

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/{account_id}/movements",
            post(create_movement).get(list_movements),
        )
        .route("/accounts/{account_id}/balance", get(get_balance))
        .route("/accounts/{account_id}/reconciliation", get(reconcile_account))
}

/// Request body for a manual movement.
#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    /// INGRESO or EGRESO.
    pub direction: Direction,
    /// Strictly positive amount.
    pub amount: Decimal,
    /// Value date; today when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Free text.
    pub description: String,
    /// Originating document.
    #[serde(default)]
    pub reference: Option<MovementReference>,
}

/// POST `/accounts/{account_id}/movements`
async fn create_movement(
    State(state): State<AppState>,
    auth: AuthUser,
    IdempotencyHeader(key): IdempotencyHeader,
    Path(account_id): Path<AccountId>,
    Json(payload): Json<CreateMovementRequest>,
) -> Result<Response, ApiError> {
    let step = CreateMovement {
        account_id,
        direction: payload.direction,
        amount: payload.amount,
        date: payload.date,
        description: payload.description,
        reference: payload.reference,
    };

    let outcome = state.orchestrator.run(&auth.context(key), &step).await?;
    state.balance_cache.invalidate(&(auth.organization_id(), account_id));

    Ok(idempotent(StatusCode::CREATED, outcome))
}

/// GET `/accounts/{account_id}/movements`
async fn list_movements(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(account_id): Path<AccountId>,
    Query(page): Query<PageRequest>,
) -> Result<Response, ApiError> {
    let movements = state
        .orchestrator
        .repositories()
        .ledger
        .list_movements(auth.organization_id(), account_id, &page)
        .await?;

    Ok(Json(movements).into_response())
}

/// GET `/accounts/{account_id}/balance`
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(account_id): Path<AccountId>,
) -> Result<Response, ApiError> {
    let cache_key = (auth.organization_id(), account_id);
    if let Some(balance) = state.balance_cache.get(&cache_key) {
        debug!(account_id = %account_id, "Balance served from cache");
        return Ok(Json(balance).into_response());
    }

    let balance = state
        .orchestrator
        .repositories()
        .ledger
        .current_balance(auth.organization_id(), account_id)
        .await?;
    state.balance_cache.insert(cache_key, balance.clone());

    Ok(Json(balance).into_response())
}

/// GET `/accounts/{account_id}/reconciliation`
async fn reconcile_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(account_id): Path<AccountId>,
) -> Result<Response, ApiError> {
    let report = state
        .orchestrator
        .repositories()
        .ledger
        .reconcile(auth.organization_id(), account_id, state.reconciliation_epsilon)
        .await?;

    if !report.is_consistent() {
        error!(
            org_id = %auth.organization_id(),
            account_id = %account_id,
            difference = %report.difference,
            chain_breaks = report.chain_breaks.len(),
            "Ledger discrepancy detected"
        );
    }
    let report = report.into_result().map_err(OperationError::from)?;

    Ok(Json(report).into_response())
}
