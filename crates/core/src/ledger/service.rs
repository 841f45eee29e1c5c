//! Ledger service for append validation.
//!
//! Stateless: the caller loads the account and the chain tip under a lock,
//! asks this service for the next running balance, and persists it.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::balance::RunningBalance;
use super::error::LedgerError;
use super::types::{AccountKind, AccountSnapshot, ChainTip, Direction, Movement, NewMovement};
use crate::document::DocumentType;

/// The movement that undoes another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalPlan {
    /// Opposite of the original direction.
    pub direction: Direction,
    /// Same amount as the original.
    pub amount: Decimal,
    /// Description recorded on the reversal.
    pub description: String,
}

/// Stateless ledger rules.
pub struct LedgerService;

impl LedgerService {
    /// Rejects zero and negative amounts.
    pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount { amount });
        }
        Ok(())
    }

    /// Requires `account` to be of kind `expected`.
    pub fn require_kind(account: &AccountSnapshot, expected: AccountKind) -> Result<(), LedgerError> {
        if account.kind != expected {
            return Err(LedgerError::WrongAccountKind {
                account_id: account.id,
                expected,
                actual: account.kind,
            });
        }
        Ok(())
    }

    /// Computes the running balance for appending `input` after `tip`.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for non-positive amounts
    /// - `AccountInactive` for inactive accounts
    /// - `BackdatedMovement` when `input.date` precedes the tip's date
    pub fn prepare_append(
        account: &AccountSnapshot,
        tip: Option<&ChainTip>,
        input: &NewMovement,
    ) -> Result<RunningBalance, LedgerError> {
        Self::validate_amount(input.amount)?;

        if !account.is_active {
            return Err(LedgerError::AccountInactive(account.id));
        }

        if let Some(tip) = tip {
            if input.date < tip.date {
                return Err(LedgerError::BackdatedMovement {
                    account_id: account.id,
                    date: input.date,
                    latest: tip.date,
                });
            }
        }

        Ok(RunningBalance::after_tip(
            tip,
            input.direction.signed(input.amount),
        ))
    }

    /// Rejects direct reversal of a movement owned by a cheque or a sale
    /// order; those only move through the document's transitions.
    pub fn require_unlinked(original: &Movement) -> Result<(), LedgerError> {
        let owner = if original.cheque_id.is_some() {
            Some(DocumentType::Cheque)
        } else {
            original
                .reference
                .map(|r| r.document_type)
                .filter(|t| matches!(t, DocumentType::Cheque | DocumentType::SaleOrder))
        };

        match owner {
            Some(document_type) => Err(LedgerError::DocumentLinked {
                movement_id: original.id,
                document_type,
            }),
            None => Ok(()),
        }
    }

    /// Value date of a reversal: the requested date, moved forward to the
    /// chain tip when the account already holds later-dated movements.
    #[must_use]
    pub fn reversal_date(requested: NaiveDate, tip: Option<&ChainTip>) -> NaiveDate {
        tip.map_or(requested, |tip| requested.max(tip.date))
    }

    /// Plans the reversal of `original`.
    ///
    /// `already_reversed` is whether a reversal of `original` already exists.
    pub fn prepare_reversal(
        original: &Movement,
        already_reversed: bool,
        reason: &str,
    ) -> Result<ReversalPlan, LedgerError> {
        if already_reversed || original.reverses_movement_id.is_some() {
            return Err(LedgerError::AlreadyReversed(original.id));
        }

        let reason = reason.trim();
        let description = if reason.is_empty() {
            format!("Reversal of movement {}", original.sequence)
        } else {
            format!("Reversal of movement {}: {reason}", original.sequence)
        };

        Ok(ReversalPlan {
            direction: original.direction.opposite(),
            amount: original.amount,
            description,
        })
    }
}
