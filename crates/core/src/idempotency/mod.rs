//! Idempotency gateway rules.
//!
//! The storage layer owns the records; this module decides what an existing
//! record means for an incoming request and computes request fingerprints.

pub mod error;
pub mod fingerprint;
pub mod policy;
pub mod types;

pub use error::IdempotencyError;
pub use fingerprint::fingerprint;
pub use policy::{Decision, IdempotencyPolicy};
pub use types::{IdempotencyKey, IdempotencyStatus, OperationType, Outcome, RecordSnapshot};
