//! Core business logic for Tesoro.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Everything the transaction core decides is decided here; the db crate only
//! loads state, calls into these modules and persists the result.
//!
//! # Modules
//!
//! - `idempotency` - Retry deduplication policy and request fingerprints
//! - `ledger` - Running balance chain, validation and reconciliation
//! - `document` - Lifecycle state machines for cheques and sale orders
//! - `credit` - Client credit risk evaluation
//! - `error` - The closed `OperationError` taxonomy
//! - `cache` - Bounded TTL cache for read paths
//! - `clock` - Injectable time source

pub mod cache;
pub mod clock;
pub mod credit;
pub mod document;
pub mod error;
pub mod idempotency;
pub mod ledger;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::OperationError;
