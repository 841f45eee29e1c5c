//! Document state machine errors.

use tesoro_shared::types::AccountId;
use thiserror::Error;
use uuid::Uuid;

use super::types::DocumentType;
use crate::ledger::AccountKind;

/// Errors raised while validating a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The target state is not in the allow-list of the current state.
    #[error("Invalid {document_type} transition from {from} to {to}")]
    InvalidTransition {
        /// Kind of document.
        document_type: DocumentType,
        /// The document.
        document_id: Uuid,
        /// The current state.
        from: &'static str,
        /// The attempted target state.
        to: &'static str,
    },

    /// The transition needs data that was not supplied.
    #[error("Transition to {to} requires {field}")]
    MissingTransitionData {
        /// Target state.
        to: &'static str,
        /// Missing field.
        field: &'static str,
    },

    /// Cheques can only be deposited into bank accounts.
    #[error("Cheques can only be deposited into bank accounts; {account_id} is {kind}")]
    InvalidDepositTarget {
        /// The rejected account.
        account_id: AccountId,
        /// Its kind.
        kind: AccountKind,
    },
}

impl TransitionError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::MissingTransitionData { .. } => "MISSING_TRANSITION_DATA",
            Self::InvalidDepositTarget { .. } => "INVALID_DEPOSIT_TARGET",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. } => 409,
            Self::MissingTransitionData { .. } | Self::InvalidDepositTarget { .. } => 400,
        }
    }
}
