//! Document lifecycle state machines.
//!
//! Pure validation of transitions for negotiable instruments (cheques) and
//! sale orders. Nothing here touches storage; the orchestrator applies the
//! state change once validation succeeds.

pub mod error;
pub mod machine;
pub mod types;

#[cfg(test)]
mod machine_props;

pub use error::TransitionError;
pub use machine::{ChequeAction, DepositTarget, StateMachine, Transition};
pub use types::{ChequeStatus, DocumentState, DocumentType, SaleOrderStatus};
