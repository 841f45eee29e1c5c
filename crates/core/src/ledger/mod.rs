//! Balance ledger logic.
//!
//! Each cash or bank account owns an append-only chain of movements:
//! - Running balance computation for the next movement
//! - Append and reversal validation
//! - Chain verification and reconciliation against the aggregate balance

pub mod balance;
pub mod chain;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::RunningBalance;
pub use chain::{ChainBreak, ChainBreakKind, ReconciliationReport, reconcile, verify_chain};
pub use error::LedgerError;
pub use service::{LedgerService, ReversalPlan};
pub use types::{
    AccountBalance, AccountKind, AccountSnapshot, ChainLink, ChainTip, Direction, Movement,
    MovementReference, NewMovement,
};
