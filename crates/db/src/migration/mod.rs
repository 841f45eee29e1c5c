//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and only use the portable
//! schema builder, so the same set runs on Postgres and on SQLite in tests.

pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

mod m20260301_000001_ledger;
mod m20260301_000002_documents;
mod m20260301_000003_idempotency_audit;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_ledger::Migration),
            Box::new(m20260301_000002_documents::Migration),
            Box::new(m20260301_000003_idempotency_audit::Migration),
        ]
    }
}

/// Money and quantity column: `numeric(19, 4)`, narrowed to the widest
/// precision SQLite accepts.
pub(crate) fn decimal_column<T: IntoIden>(manager: &SchemaManager, column: T) -> ColumnDef {
    let precision = match manager.get_database_backend() {
        DatabaseBackend::Sqlite => 16,
        _ => 19,
    };
    ColumnDef::new(column).decimal_len(precision, 4).to_owned()
}
