//! Property-based tests for running balances and chain verification.

use proptest::prelude::*;
use rust_decimal::Decimal;
use tesoro_shared::types::MovementId;

use crate::ledger::balance::RunningBalance;
use crate::ledger::chain::verify_chain;
use crate::ledger::types::{ChainLink, Direction};

/// Strategy for generating movement amounts (strictly positive, two decimals).
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Ingreso), Just(Direction::Egreso)]
}

fn movements_strategy(max_len: usize) -> impl Strategy<Value = Vec<(Direction, Decimal)>> {
    prop::collection::vec((direction_strategy(), amount_strategy()), 1..=max_len)
}

/// Builds the chain an append-only writer would persist.
fn build_chain(movements: &[(Direction, Decimal)]) -> Vec<ChainLink> {
    let mut links: Vec<ChainLink> = Vec::with_capacity(movements.len());
    let mut previous: Option<RunningBalance> = None;
    for (direction, amount) in movements {
        let change = direction.signed(*amount);
        let rb = match &previous {
            Some(prev) => RunningBalance::next_entry(prev, change),
            None => RunningBalance::first_entry(change),
        };
        links.push(ChainLink {
            id: MovementId::new(),
            sequence: rb.sequence,
            direction: *direction,
            amount: *amount,
            balance_before: rb.balance_before,
            balance_after: rb.balance_after,
        });
        previous = Some(rb);
    }
    links
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every link satisfies `after = before ± amount` and chains onto its predecessor.
    #[test]
    fn prop_appended_chain_is_consistent(movements in movements_strategy(30)) {
        let chain = build_chain(&movements);

        prop_assert!(verify_chain(&chain).is_empty());
        for pair in chain.windows(2) {
            prop_assert_eq!(pair[1].balance_before, pair[0].balance_after);
            prop_assert_eq!(pair[1].sequence, pair[0].sequence + 1);
        }
    }

    /// The last balance equals ingresos minus egresos.
    #[test]
    fn prop_final_balance_equals_aggregate(movements in movements_strategy(30)) {
        let chain = build_chain(&movements);
        let aggregate: Decimal = movements
            .iter()
            .map(|(direction, amount)| direction.signed(*amount))
            .sum();

        prop_assert_eq!(chain.last().map(|l| l.balance_after), Some(aggregate));
        prop_assert_eq!(chain.len() as i64, chain.last().map_or(0, |l| l.sequence));
    }

    /// Tampering with any balance_after is detected.
    #[test]
    fn prop_tampered_link_is_detected(
        movements in movements_strategy(20),
        index in any::<prop::sample::Index>(),
        delta in amount_strategy(),
    ) {
        let mut chain = build_chain(&movements);
        let i = index.index(chain.len());
        chain[i].balance_after += delta;

        let breaks = verify_chain(&chain);
        prop_assert!(!breaks.is_empty());
        prop_assert_eq!(breaks[0].sequence, chain[i].sequence);
    }

    /// A reversal restores the balance that preceded the reversed movement.
    #[test]
    fn prop_reversal_restores_balance(
        movements in movements_strategy(20),
        index in any::<prop::sample::Index>(),
    ) {
        let mut with_reversal = movements.clone();
        let (direction, amount) = movements[index.index(movements.len())];
        with_reversal.push((direction.opposite(), amount));

        let before: Decimal = movements.iter().map(|(d, a)| d.signed(*a)).sum();
        let chain = build_chain(&with_reversal);
        let last = chain.last().map(|l| l.balance_after);

        prop_assert_eq!(last, Some(before - direction.signed(amount)));
    }
}
