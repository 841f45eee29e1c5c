//! Tesoro API server.
//!
//! Loads configuration, migrates the schema, starts the background
//! maintenance tasks and serves the HTTP API.

use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tesoro_api::{AppState, create_router};
use tesoro_core::idempotency::IdempotencyPolicy;
use tesoro_core::{SharedClock, SystemClock};
use tesoro_db::migration::Migrator;
use tesoro_db::{IdempotencyRepository, IdempotencySweeper, LedgerRepository, connect};
use tesoro_shared::AppConfig;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tesoro=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    Migrator::up(&db, None).await?;
    info!("Migrations applied");

    let clock: SharedClock = SystemClock::shared();

    let sweeper = IdempotencySweeper::new(
        IdempotencyRepository::new(db.clone()),
        IdempotencyPolicy::from(&config.idempotency),
        clock.clone(),
    );
    let sweep_every = Duration::from_secs(config.idempotency.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.sweep_once().await {
                warn!(error = %e, "Idempotency sweep failed");
            }
        }
    });

    let ledger = LedgerRepository::new(db.clone());
    let epsilon = config.ledger.reconciliation_epsilon;
    let reconcile_every = Duration::from_secs(config.ledger.reconcile_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(reconcile_every);
        loop {
            interval.tick().await;
            match ledger.reconcile_all(epsilon).await {
                Ok(reports) => {
                    for report in reports.iter().filter(|r| !r.is_consistent()) {
                        error!(
                            account_id = %report.account_id,
                            difference = %report.difference,
                            chain_breaks = report.chain_breaks.len(),
                            "Ledger discrepancy detected"
                        );
                    }
                    info!(accounts = reports.len(), "Ledger reconciliation finished");
                }
                Err(e) => warn!(error = %e, "Ledger reconciliation failed"),
            }
        }
    });

    let state = AppState::new(db, &config, clock);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
