//! Chain verification and reconciliation.
//!
//! The materialized balance (balance_after of the last movement) and the
//! aggregate balance (ingresos minus egresos) must agree within epsilon, and
//! every link must chain onto its predecessor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tesoro_shared::types::{AccountId, MovementId};

use super::error::LedgerError;
use super::types::ChainLink;

/// What is wrong with a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBreakKind {
    /// Sequence does not follow the previous link.
    SequenceGap,
    /// balance_before differs from the previous balance_after.
    BrokenLink,
    /// balance_after differs from balance_before ± amount.
    BadArithmetic,
}

/// A link that violates the chain invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// Offending movement.
    pub movement_id: MovementId,
    /// Its sequence.
    pub sequence: i64,
    /// What is wrong.
    pub kind: ChainBreakKind,
    /// Value the invariant requires.
    pub expected: Decimal,
    /// Value found.
    pub actual: Decimal,
}

/// Checks every link of an account's chain, ordered by sequence.
///
/// Returns at most one break per link, in chain order.
#[must_use]
pub fn verify_chain(links: &[ChainLink]) -> Vec<ChainBreak> {
    let mut breaks = Vec::new();
    let mut previous: Option<&ChainLink> = None;

    for link in links {
        let expected_sequence = previous.map_or(1, |p| p.sequence + 1);
        let expected_before = previous.map_or(Decimal::ZERO, |p| p.balance_after);
        let expected_after = link.balance_before + link.direction.signed(link.amount);

        let broken = if link.sequence != expected_sequence {
            Some((
                ChainBreakKind::SequenceGap,
                Decimal::from(expected_sequence),
                Decimal::from(link.sequence),
            ))
        } else if link.balance_before != expected_before {
            Some((ChainBreakKind::BrokenLink, expected_before, link.balance_before))
        } else if link.balance_after != expected_after {
            Some((ChainBreakKind::BadArithmetic, expected_after, link.balance_after))
        } else {
            None
        };

        if let Some((kind, expected, actual)) = broken {
            breaks.push(ChainBreak {
                movement_id: link.id,
                sequence: link.sequence,
                kind,
                expected,
                actual,
            });
        }
        previous = Some(link);
    }

    breaks
}

/// Result of comparing the materialized and aggregate balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Account checked.
    pub account_id: AccountId,
    /// Sum of ingresos minus sum of egresos.
    pub aggregate_balance: Decimal,
    /// balance_after of the latest movement.
    pub materialized_balance: Decimal,
    /// `materialized - aggregate`.
    pub difference: Decimal,
    /// Tolerance used.
    pub epsilon: Decimal,
    /// Number of movements inspected.
    pub movement_count: usize,
    /// Links violating the chain invariant.
    pub chain_breaks: Vec<ChainBreak>,
}

impl ReconciliationReport {
    /// True when balances agree within epsilon and the chain is intact.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.difference.abs() <= self.epsilon && self.chain_breaks.is_empty()
    }

    /// Converts an inconsistent report into `LedgerError::Discrepancy`.
    pub fn into_result(self) -> Result<Self, LedgerError> {
        if self.is_consistent() {
            Ok(self)
        } else {
            Err(LedgerError::Discrepancy {
                account_id: self.account_id,
                aggregate: self.aggregate_balance,
                materialized: self.materialized_balance,
                difference: self.difference,
                chain_breaks: self.chain_breaks.len(),
            })
        }
    }
}

/// Reconciles an account's chain, ordered by sequence.
#[must_use]
pub fn reconcile(account_id: AccountId, links: &[ChainLink], epsilon: Decimal) -> ReconciliationReport {
    let aggregate_balance: Decimal = links
        .iter()
        .map(|link| link.direction.signed(link.amount))
        .sum();
    let materialized_balance = links.last().map_or(Decimal::ZERO, |link| link.balance_after);

    ReconciliationReport {
        account_id,
        aggregate_balance,
        materialized_balance,
        difference: materialized_balance - aggregate_balance,
        epsilon,
        movement_count: links.len(),
        chain_breaks: verify_chain(links),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::Direction;
    use rust_decimal_macros::dec;

    fn link(sequence: i64, direction: Direction, amount: Decimal, before: Decimal, after: Decimal) -> ChainLink {
        ChainLink {
            id: MovementId::new(),
            sequence,
            direction,
            amount,
            balance_before: before,
            balance_after: after,
        }
    }

    #[test]
    fn deposit_then_bounce_chain_is_consistent() {
        let chain = vec![
            link(1, Direction::Ingreso, dec!(5000), dec!(0), dec!(5000)),
            link(2, Direction::Egreso, dec!(5000), dec!(5000), dec!(0)),
        ];

        let report = reconcile(AccountId::new(), &chain, dec!(0.01));
        assert!(report.is_consistent());
        assert_eq!(report.aggregate_balance, dec!(0));
        assert_eq!(report.materialized_balance, dec!(0));
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn empty_chain_reconciles_to_zero() {
        let report = reconcile(AccountId::new(), &[], dec!(0.01));
        assert!(report.is_consistent());
        assert_eq!(report.movement_count, 0);
    }

    #[test]
    fn broken_link_is_reported() {
        let chain = vec![
            link(1, Direction::Ingreso, dec!(100), dec!(0), dec!(100)),
            link(2, Direction::Ingreso, dec!(50), dec!(90), dec!(140)),
        ];

        let breaks = verify_chain(&chain);
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].kind, ChainBreakKind::BrokenLink);
        assert_eq!(breaks[0].expected, dec!(100));
        assert_eq!(breaks[0].actual, dec!(90));
    }

    #[test]
    fn sequence_gap_is_reported() {
        let chain = vec![
            link(1, Direction::Ingreso, dec!(100), dec!(0), dec!(100)),
            link(3, Direction::Egreso, dec!(40), dec!(100), dec!(60)),
        ];

        let breaks = verify_chain(&chain);
        assert_eq!(breaks[0].kind, ChainBreakKind::SequenceGap);
    }

    #[test]
    fn arithmetic_break_fails_even_within_epsilon() {
        let chain = vec![link(1, Direction::Ingreso, dec!(100), dec!(0), dec!(100.005))];

        let report = reconcile(AccountId::new(), &chain, dec!(0.01));
        assert_eq!(report.difference, dec!(0.005));
        assert!(!report.is_consistent());
        assert!(matches!(
            report.into_result(),
            Err(LedgerError::Discrepancy { chain_breaks: 1, .. })
        ));
    }
}
