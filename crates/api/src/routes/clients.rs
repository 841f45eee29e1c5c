//! Credit evaluation preview.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tesoro_core::credit::CreditEvaluator;
use tesoro_core::{Clock, OperationError};
use tesoro_shared::types::ClientId;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

/// Creates the client routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/clients/{client_id}/credit", get(credit_preview))
}

/// Query for a preview.
#[derive(Debug, Deserialize)]
pub struct CreditPreviewQuery {
    /// Proposed order amount; zero evaluates the current position.
    #[serde(default)]
    pub amount: Decimal,
}

/// GET `/clients/{client_id}/credit?amount=`
///
/// Evaluates without side effects; a blocking decision is still a 200.
async fn credit_preview(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(client_id): Path<ClientId>,
    Query(query): Query<CreditPreviewQuery>,
) -> Result<Response, ApiError> {
    if query.amount.is_sign_negative() {
        return Err(OperationError::Validation("amount must not be negative".to_string()).into());
    }

    let profile = state
        .orchestrator
        .repositories()
        .credit
        .load_profile(auth.organization_id(), client_id)
        .await?;
    let decision = CreditEvaluator::evaluate(
        &profile,
        query.amount,
        state.orchestrator.clock().today(),
        state.orchestrator.credit_config(),
    );

    Ok(Json(decision).into_response())
}
