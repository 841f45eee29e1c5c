//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Methods ending in `_in` run on a caller-supplied transaction.

pub mod audit;
pub mod cheque;
pub mod credit;
pub mod idempotency;
pub mod ledger;
pub mod sale_order;

pub use audit::{AuditRepository, NewAuditRecord};
pub use cheque::ChequeRepository;
pub use credit::{CreditRepository, NewInvoice};
pub use idempotency::{IdempotencyRepository, NewIdempotencyRecord};
pub use ledger::LedgerRepository;
pub use sale_order::SaleOrderRepository;
