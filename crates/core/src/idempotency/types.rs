//! Idempotency domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::IdempotencyError;

/// Longest accepted idempotency key.
pub const MAX_KEY_LEN: usize = 255;

/// Mutation types guarded by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Manual ledger movement.
    CreateMovement,
    /// Reversal of a movement.
    ReverseMovement,
    /// Sale order confirmation.
    ConfirmSale,
    /// Cheque deposit.
    DepositCheque,
    /// Cheque clearing.
    ClearCheque,
    /// Cheque rejection by the bank.
    BounceCheque,
    /// Cheque endorsement.
    EndorseCheque,
    /// Cheque cancellation.
    VoidCheque,
    /// Bounced cheque back to portfolio.
    RenegotiateCheque,
}

impl OperationType {
    /// Every operation type.
    pub const ALL: [Self; 9] = [
        Self::CreateMovement,
        Self::ReverseMovement,
        Self::ConfirmSale,
        Self::DepositCheque,
        Self::ClearCheque,
        Self::BounceCheque,
        Self::EndorseCheque,
        Self::VoidCheque,
        Self::RenegotiateCheque,
    ];

    /// Returns the string representation stored in the records table.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateMovement => "create_movement",
            Self::ReverseMovement => "reverse_movement",
            Self::ConfirmSale => "confirm_sale",
            Self::DepositCheque => "deposit_cheque",
            Self::ClearCheque => "clear_cheque",
            Self::BounceCheque => "bounce_cheque",
            Self::EndorseCheque => "endorse_cheque",
            Self::VoidCheque => "void_cheque",
            Self::RenegotiateCheque => "renegotiate_cheque",
        }
    }

    /// Parses the stored string representation.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// True when the operation must pass a credit evaluation.
    #[must_use]
    pub fn is_credit_sensitive(&self) -> bool {
        matches!(self, Self::ConfirmSale)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an idempotency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdempotencyStatus {
    /// Work is running.
    InProgress,
    /// Work finished; the response is stored.
    Completed,
    /// Abandoned; the key may be reused.
    Failed,
}

impl IdempotencyStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

/// A validated client-supplied idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validates a raw key.
    ///
    /// Surrounding whitespace is ignored and a blank key counts as no key.
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, IdempotencyError> {
        let Some(key) = raw.map(str::trim).filter(|k| !k.is_empty()) else {
            return Ok(None);
        };

        if key.chars().count() > MAX_KEY_LEN {
            return Err(IdempotencyError::InvalidKey {
                reason: format!("longer than {MAX_KEY_LEN} characters"),
            });
        }
        if key.chars().any(char::is_control) {
            return Err(IdempotencyError::InvalidKey {
                reason: "contains control characters".to_string(),
            });
        }

        Ok(Some(Self(key.to_string())))
    }

    /// The key as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The parts of a stored record the policy needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// Record status.
    pub status: IdempotencyStatus,
    /// Fingerprint of the original request.
    pub fingerprint: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record stops blocking the key.
    pub expires_at: DateTime<Utc>,
}

/// Result of a gateway-guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    /// The operation's response.
    pub value: T,
    /// True when served from a stored record.
    pub replayed: bool,
    /// Key the request carried, if any.
    pub idempotency_key: Option<IdempotencyKey>,
}

impl<T> Outcome<T> {
    /// A freshly executed result.
    #[must_use]
    pub fn fresh(value: T, idempotency_key: Option<IdempotencyKey>) -> Self {
        Self {
            value,
            replayed: false,
            idempotency_key,
        }
    }

    /// A result served from a stored record.
    #[must_use]
    pub fn replayed(value: T, idempotency_key: IdempotencyKey) -> Self {
        Self {
            value,
            replayed: true,
            idempotency_key: Some(idempotency_key),
        }
    }

    /// Maps the value, keeping replay metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            replayed: self.replayed,
            idempotency_key: self.idempotency_key,
        }
    }
}
