//! Sale order confirmation.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::post,
};
use serde::Deserialize;
use tesoro_db::ConfirmSale;
use tesoro_shared::types::{AccountId, SaleOrderId};

use crate::error::ApiError;
use crate::extractors::IdempotencyHeader;
use crate::middleware::AuthUser;
use crate::response::idempotent;
use crate::AppState;

/// Creates the sale routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sales/{sale_order_id}/confirm", post(confirm_sale))
}

/// Request body for a confirmation.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmSaleRequest {
    /// Collect the full total into this account instead of invoicing.
    #[serde(default)]
    pub collect_into: Option<AccountId>,
    /// Proceed despite overridable credit findings.
    #[serde(default)]
    pub credit_override: bool,
}

/// POST `/sales/{sale_order_id}/confirm`
async fn confirm_sale(
    State(state): State<AppState>,
    auth: AuthUser,
    IdempotencyHeader(key): IdempotencyHeader,
    Path(sale_order_id): Path<SaleOrderId>,
    Json(payload): Json<ConfirmSaleRequest>,
) -> Result<Response, ApiError> {
    let step = ConfirmSale {
        sale_order_id,
        collect_into: payload.collect_into,
        credit_override: payload.credit_override,
    };

    let outcome = state.orchestrator.run(&auth.context(key), &step).await?;
    if let Some(account_id) = step.collect_into {
        state
            .balance_cache
            .invalidate(&(auth.organization_id(), account_id));
    }

    Ok(idempotent(StatusCode::OK, outcome))
}
