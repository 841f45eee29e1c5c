//! Client credit risk evaluation.
//!
//! Computes exposure, utilization and overdue status for a client and turns
//! them into blocking errors and non-blocking warnings.

pub mod evaluator;
pub mod types;

pub use evaluator::CreditEvaluator;
pub use types::{
    ClientCreditInfo, ClientCreditProfile, CreditConfig, CreditDecision, CreditIssue,
    InvoiceStatus, OpenInvoice,
};
