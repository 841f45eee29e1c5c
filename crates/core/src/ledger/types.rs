//! Ledger domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tesoro_shared::types::{AccountId, ChequeId, MovementId, OrganizationId};
use uuid::Uuid;

use crate::document::DocumentType;

/// Kind of balance holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    /// Petty cash or till.
    Cash,
    /// Bank account.
    Bank,
}

impl AccountKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Bank => "BANK",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CASH" => Some(Self::Cash),
            "BANK" => Some(Self::Bank),
            _ => None,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Money in.
    Ingreso,
    /// Money out.
    Egreso,
}

impl Direction {
    /// Returns the string representation of the direction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingreso => "INGRESO",
            Self::Egreso => "EGRESO",
        }
    }

    /// Parses a direction from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INGRESO" => Some(Self::Ingreso),
            "EGRESO" => Some(Self::Egreso),
            _ => None,
        }
    }

    /// Signed effect of `amount` on the balance.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Ingreso => amount,
            Self::Egreso => -amount,
        }
    }

    /// The direction that undoes this one.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Ingreso => Self::Egreso,
            Self::Egreso => Self::Ingreso,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state of an account needed to validate an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Account id.
    pub id: AccountId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Cash or bank.
    pub kind: AccountKind,
    /// Inactive accounts reject appends.
    pub is_active: bool,
}

/// Document a movement originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReference {
    /// Kind of document.
    pub document_type: DocumentType,
    /// Document id.
    pub document_id: Uuid,
}

/// Input for appending a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    /// Target account.
    pub account_id: AccountId,
    /// In or out.
    pub direction: Direction,
    /// Strictly positive amount.
    pub amount: Decimal,
    /// Value date.
    pub date: NaiveDate,
    /// Free text.
    pub description: String,
    /// Originating document, if any.
    #[serde(default)]
    pub reference: Option<MovementReference>,
    /// Cheque the movement belongs to, if any.
    #[serde(default)]
    pub cheque_id: Option<ChequeId>,
}

/// The most recent movement on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTip {
    /// Sequence of the last movement.
    pub sequence: i64,
    /// Balance after the last movement.
    pub balance_after: Decimal,
    /// Date of the last movement.
    pub date: NaiveDate,
}

/// One persisted movement, as far as the chain is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    /// Movement id.
    pub id: MovementId,
    /// Position in the account's chain, starting at 1.
    pub sequence: i64,
    /// In or out.
    pub direction: Direction,
    /// Amount moved.
    pub amount: Decimal,
    /// Balance before the movement.
    pub balance_before: Decimal,
    /// Balance after the movement.
    pub balance_after: Decimal,
}

/// A persisted movement as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Movement id.
    pub id: MovementId,
    /// Account the movement belongs to.
    pub account_id: AccountId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Position in the account's chain.
    pub sequence: i64,
    /// In or out.
    pub direction: Direction,
    /// Amount moved.
    pub amount: Decimal,
    /// Value date.
    pub date: NaiveDate,
    /// Balance before the movement.
    pub balance_before: Decimal,
    /// Balance after the movement.
    pub balance_after: Decimal,
    /// Free text.
    pub description: String,
    /// Originating document, if any.
    pub reference: Option<MovementReference>,
    /// Cheque the movement belongs to, if any.
    pub cheque_id: Option<ChequeId>,
    /// Movement this one reverses, if any.
    pub reverses_movement_id: Option<MovementId>,
}

impl Movement {
    /// Chain view of this movement.
    #[must_use]
    pub fn link(&self) -> ChainLink {
        ChainLink {
            id: self.id,
            sequence: self.sequence,
            direction: self.direction,
            amount: self.amount,
            balance_before: self.balance_before,
            balance_after: self.balance_after,
        }
    }
}

/// Current balance of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account.
    pub account_id: AccountId,
    /// Balance after the latest movement, zero when there is none.
    pub balance: Decimal,
    /// Number of movements in the chain.
    pub movement_count: i64,
    /// Date of the latest movement.
    pub last_movement_date: Option<NaiveDate>,
}
