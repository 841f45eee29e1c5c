//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod accounts;
pub mod cheques;
pub mod clients;
pub mod health;
pub mod movements;
pub mod sales;

/// Creates the API router; everything but the health check needs a bearer
/// token.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(accounts::routes())
        .merge(movements::routes())
        .merge(cheques::routes())
        .merge(sales::routes())
        .merge(clients::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(health::routes()).merge(protected_routes)
}
