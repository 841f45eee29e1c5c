//! The closed set of errors an orchestrated operation can end with.
//!
//! Callers match on variants; messages are for humans only.

use rust_decimal::Decimal;
use serde_json::{Value, json};
use tesoro_shared::types::ProductId;
use thiserror::Error;
use uuid::Uuid;

use crate::credit::CreditDecision;
use crate::document::TransitionError;
use crate::idempotency::IdempotencyError;
use crate::ledger::LedgerError;

/// Errors surfaced by the transaction core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Ledger rule violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Document lifecycle rule violated.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Idempotency rule violated.
    #[error(transparent)]
    Idempotency(#[from] IdempotencyError),

    /// Credit evaluation produced blocking findings.
    #[error("Credit check blocked the operation for client {}", decision.client_id)]
    CreditBlocked {
        /// The full evaluation.
        decision: Box<CreditDecision>,
    },

    /// Referenced entity does not exist in the caller's organization.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Requested id.
        id: Uuid,
    },

    /// Not enough stock to confirm a sale.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        /// The product.
        product_id: ProductId,
        /// Units in stock.
        available: Decimal,
        /// Units requested.
        requested: Decimal,
    },

    /// Request is well-formed but semantically unusable.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Driver message.
        message: String,
        /// Deadlock, serialization failure or lock timeout.
        transient: bool,
    },
}

impl OperationError {
    /// Shorthand for `NotFound`.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.error_code(),
            Self::Transition(e) => e.error_code(),
            Self::Idempotency(e) => e.error_code(),
            Self::CreditBlocked { .. } => "CREDIT_BLOCKED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Ledger(e) => e.http_status_code(),
            Self::Transition(e) => e.http_status_code(),
            Self::Idempotency(e) => e.http_status_code(),
            Self::CreditBlocked { .. } => 422,
            Self::NotFound { .. } => 404,
            Self::InsufficientStock { .. } => 409,
            Self::Validation(_) => 400,
            Self::Storage { transient: true, .. } => 503,
            Self::Storage { transient: false, .. } => 500,
        }
    }

    /// True when the same request may succeed later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_retryable(),
            Self::Idempotency(e) => e.is_retryable(),
            Self::Storage { transient, .. } => *transient,
            _ => false,
        }
    }

    /// True for storage failures worth one immediate retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage { transient: true, .. })
    }

    /// Machine-readable detail for API responses.
    #[must_use]
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Ledger(LedgerError::InvalidAmount { amount }) => Some(json!({ "amount": amount })),
            Self::Ledger(LedgerError::Discrepancy {
                account_id,
                aggregate,
                materialized,
                difference,
                chain_breaks,
            }) => Some(json!({
                "account_id": account_id,
                "aggregate": aggregate,
                "materialized": materialized,
                "difference": difference,
                "chain_breaks": chain_breaks,
            })),
            Self::Ledger(LedgerError::DocumentLinked {
                movement_id,
                document_type,
            }) => Some(json!({ "movement_id": movement_id, "document_type": document_type.as_str() })),
            Self::Ledger(LedgerError::BackdatedMovement { date, latest, .. }) => {
                Some(json!({ "date": date, "latest": latest }))
            }
            Self::Transition(TransitionError::InvalidTransition { from, to, document_type, .. }) => {
                Some(json!({ "document_type": document_type, "from": from, "to": to }))
            }
            Self::Transition(TransitionError::MissingTransitionData { field, to }) => {
                Some(json!({ "field": field, "to": to }))
            }
            Self::CreditBlocked { decision } => serde_json::to_value(decision.as_ref()).ok(),
            Self::InsufficientStock {
                product_id,
                available,
                requested,
            } => Some(json!({
                "product_id": product_id,
                "available": available,
                "requested": requested,
            })),
            Self::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::{ClientCreditInfo, ClientCreditProfile, CreditConfig, CreditEvaluator};
    use crate::idempotency::OperationType;
    use chrono::NaiveDate;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tesoro_shared::types::{AccountId, ClientId};

    fn blocked_decision() -> CreditDecision {
        let profile = ClientCreditProfile {
            client: ClientCreditInfo {
                client_id: ClientId::new(),
                credit_limit: Some(dec!(100)),
                is_blocked: false,
            },
            open_invoices: vec![],
        };
        CreditEvaluator::evaluate(
            &profile,
            dec!(150),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &CreditConfig::default(),
        )
    }

    #[rstest]
    #[case(OperationError::from(LedgerError::InvalidAmount { amount: dec!(0) }), 400, "INVALID_AMOUNT")]
    #[case(OperationError::from(LedgerError::Contention { account_id: AccountId::new() }), 409, "LEDGER_CONTENTION")]
    #[case(OperationError::from(IdempotencyError::Conflict { operation: OperationType::CreateMovement, key: "k".into() }), 422, "IDEMPOTENCY_CONFLICT")]
    #[case(OperationError::from(IdempotencyError::InProgress { operation: OperationType::CreateMovement, key: "k".into() }), 409, "IDEMPOTENCY_IN_PROGRESS")]
    #[case(OperationError::not_found("account", Uuid::nil()), 404, "NOT_FOUND")]
    #[case(OperationError::Storage { message: "deadlock".into(), transient: true }, 503, "STORAGE_ERROR")]
    #[case(OperationError::Storage { message: "disk".into(), transient: false }, 500, "STORAGE_ERROR")]
    fn maps_to_http(#[case] err: OperationError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.http_status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn credit_blocked_carries_decision_details() {
        let err = OperationError::CreditBlocked {
            decision: Box::new(blocked_decision()),
        };
        assert_eq!(err.http_status_code(), 422);
        assert!(!err.is_retryable());

        let details = err.details().unwrap();
        assert_eq!(details["available"], "100");
        assert_eq!(details["projected"], "150");
    }

    #[test]
    fn only_transient_storage_errors_are_transient() {
        assert!(OperationError::Storage { message: String::new(), transient: true }.is_transient());
        assert!(!OperationError::from(LedgerError::Contention { account_id: AccountId::new() }).is_transient());
        assert!(OperationError::from(LedgerError::Contention { account_id: AccountId::new() }).is_retryable());
    }
}
