//! Running balance calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::ChainTip;

/// Running balance information for a movement.
///
/// - `sequence`: gap-free counter per account, starting at 1
/// - `balance_before`: balance after the previous movement
/// - `balance_after`: `balance_before` plus the signed amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Position in the account's chain.
    pub sequence: i64,
    /// Balance before this movement.
    pub balance_before: Decimal,
    /// Balance after this movement.
    pub balance_after: Decimal,
}

impl RunningBalance {
    /// Running balance for the first movement on an account.
    #[must_use]
    pub fn first_entry(balance_change: Decimal) -> Self {
        Self {
            sequence: 1,
            balance_before: Decimal::ZERO,
            balance_after: balance_change,
        }
    }

    /// Running balance following `previous`.
    #[must_use]
    pub fn next_entry(previous: &Self, balance_change: Decimal) -> Self {
        Self {
            sequence: previous.sequence + 1,
            balance_before: previous.balance_after,
            balance_after: previous.balance_after + balance_change,
        }
    }

    /// Running balance following the persisted tip, or the first one.
    #[must_use]
    pub fn after_tip(tip: Option<&ChainTip>, balance_change: Decimal) -> Self {
        match tip {
            Some(tip) => Self {
                sequence: tip.sequence + 1,
                balance_before: tip.balance_after,
                balance_after: tip.balance_after + balance_change,
            },
            None => Self::first_entry(balance_change),
        }
    }
}
