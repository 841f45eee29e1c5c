//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for the transaction core
//! - Bearer authentication middleware
//! - `Idempotency-Key` handling
//! - Error to HTTP mapping

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tesoro_core::SharedClock;
use tesoro_core::cache::TtlCache;
use tesoro_core::credit::CreditConfig;
use tesoro_core::idempotency::IdempotencyPolicy;
use tesoro_core::ledger::AccountBalance;
use tesoro_db::TransactionOrchestrator;
use tesoro_shared::types::{AccountId, OrganizationId};
use tesoro_shared::{AppConfig, JwtConfig, JwtService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Cache of account balances served by the balance endpoint.
pub type BalanceCache = TtlCache<(OrganizationId, AccountId), AccountBalance>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Bearer token verification.
    pub jwt_service: Arc<JwtService>,
    /// Runs every mutating operation.
    pub orchestrator: Arc<TransactionOrchestrator>,
    /// Short-lived balance reads.
    pub balance_cache: BalanceCache,
    /// Tolerance used by the reconciliation endpoint.
    pub reconciliation_epsilon: Decimal,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires the state from configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &AppConfig, clock: SharedClock) -> Self {
        let jwt_service = JwtService::new(JwtConfig {
            secret: config.jwt.secret.clone(),
            leeway_secs: config.jwt.leeway_secs,
            ..JwtConfig::default()
        });
        let orchestrator = TransactionOrchestrator::new(
            db.clone(),
            IdempotencyPolicy::from(&config.idempotency),
            CreditConfig::from(&config.credit),
            clock.clone(),
        );
        let balance_cache = TtlCache::with_config(
            config.cache.max_capacity,
            chrono::Duration::seconds(config.cache.ttl_secs),
            clock,
        );

        Self {
            db: Arc::new(db),
            jwt_service: Arc::new(jwt_service),
            orchestrator: Arc::new(orchestrator),
            balance_cache,
            reconciliation_epsilon: config.ledger.reconciliation_epsilon,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
