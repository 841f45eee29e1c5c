//! Ledger error types.
//!
//! Validation errors are raised before anything is written; `Discrepancy`
//! and `Contention` come from the chain itself.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tesoro_shared::types::{AccountId, MovementId};
use thiserror::Error;

use super::types::AccountKind;
use crate::document::DocumentType;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Movement amount must be strictly positive.
    #[error("Movement amount must be positive, got {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// Movement is dated before the account's latest movement.
    #[error("Movement dated {date} is earlier than the latest movement on account {account_id} ({latest})")]
    BackdatedMovement {
        /// The account.
        account_id: AccountId,
        /// Requested date.
        date: NaiveDate,
        /// Date of the latest movement.
        latest: NaiveDate,
    },

    // ========== Account Errors ==========
    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Account is of the wrong kind for the operation.
    #[error("Account {account_id} is {actual}, expected {expected}")]
    WrongAccountKind {
        /// The account.
        account_id: AccountId,
        /// Kind the operation requires.
        expected: AccountKind,
        /// Kind of the account.
        actual: AccountKind,
    },

    // ========== Reversal Errors ==========
    /// Movement has already been reversed.
    #[error("Movement {0} has already been reversed")]
    AlreadyReversed(MovementId),

    /// Movement belongs to a document and only changes through its lifecycle.
    #[error("Movement {movement_id} belongs to a {document_type}; use the document's actions instead")]
    DocumentLinked {
        /// The movement.
        movement_id: MovementId,
        /// Owning document type.
        document_type: DocumentType,
    },

    // ========== Chain Errors ==========
    /// Materialized and aggregate balances disagree, or the chain is broken.
    #[error(
        "Ledger discrepancy on account {account_id}: aggregate {aggregate}, materialized {materialized} ({chain_breaks} broken links)"
    )]
    Discrepancy {
        /// The account.
        account_id: AccountId,
        /// Sum of ingresos minus egresos.
        aggregate: Decimal,
        /// Latest balance_after.
        materialized: Decimal,
        /// `materialized - aggregate`.
        difference: Decimal,
        /// Number of broken links.
        chain_breaks: usize,
    },

    // ========== Concurrency Errors ==========
    /// Lost the append race twice in a row.
    #[error("Concurrent appends on account {account_id}, please retry")]
    Contention {
        /// The account.
        account_id: AccountId,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::BackdatedMovement { .. } => "BACKDATED_MOVEMENT",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::WrongAccountKind { .. } => "WRONG_ACCOUNT_KIND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::DocumentLinked { .. } => "DOCUMENT_LINKED_MOVEMENT",
            Self::Discrepancy { .. } => "LEDGER_DISCREPANCY",
            Self::Contention { .. } => "LEDGER_CONTENTION",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount { .. }
            | Self::BackdatedMovement { .. }
            | Self::AccountInactive(_)
            | Self::WrongAccountKind { .. } => 400,

            // 409 Conflict
            Self::AlreadyReversed(_) | Self::DocumentLinked { .. } | Self::Contention { .. } => 409,

            // 500 Internal Server Error - needs manual review
            Self::Discrepancy { .. } => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }
}
