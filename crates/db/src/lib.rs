//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//! - The idempotency gateway and its sweeper
//! - The transaction orchestrator that runs every financial mutation

pub mod entities;
pub mod error;
pub mod gateway;
pub mod migration;
pub mod orchestrator;
pub mod repositories;
pub mod sweeper;

pub use gateway::{Admission, Claim, IdempotencyGateway};
pub use orchestrator::{
    AtomicStep, ChequeCommand, ChequeOutcome, ChequeRequest, ConfirmSale, CreateMovement,
    OperationContext, Repositories, ReverseMovement, SaleConfirmation, StepContext,
    TransactionOrchestrator,
};
pub use repositories::{
    AuditRepository, ChequeRepository, CreditRepository, IdempotencyRepository, LedgerRepository,
    SaleOrderRepository,
};
pub use sweeper::{IdempotencySweeper, SweepReport};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}
