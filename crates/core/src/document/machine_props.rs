//! Property-based tests for the document state machines.
//!
//! For every (from, to) pair, validation succeeds exactly when `to` is in
//! the allow-list of `from`.

use proptest::prelude::*;
use tesoro_shared::types::UserId;
use uuid::Uuid;

use crate::document::error::TransitionError;
use crate::document::machine::StateMachine;
use crate::document::types::{ChequeStatus, DocumentState, SaleOrderStatus};

fn arb_state<S: DocumentState>() -> impl Strategy<Value = S> {
    prop::sample::select(S::all())
}

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn check_pair<S: DocumentState>(from: S, to: S, id: Uuid) -> Result<(), TestCaseError> {
    let result = StateMachine::validate_transition(id, from, to, UserId::new());
    if from.allowed_targets().contains(&to) {
        let transition = result.map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(transition.to, to);
        prop_assert_eq!(transition.document_id, id);
    } else {
        match result {
            Err(TransitionError::InvalidTransition {
                from: f,
                to: t,
                document_id,
                ..
            }) => {
                prop_assert_eq!(f, from.as_str());
                prop_assert_eq!(t, to.as_str());
                prop_assert_eq!(document_id, id);
            }
            other => prop_assert!(false, "expected InvalidTransition, got {:?}", other),
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Cheque validation agrees with the allow-list for every pair.
    #[test]
    fn prop_cheque_allow_list_is_complete(
        from in arb_state::<ChequeStatus>(),
        to in arb_state::<ChequeStatus>(),
        id in arb_uuid(),
    ) {
        check_pair(from, to, id)?;
    }

    /// Sale order validation agrees with the allow-list for every pair.
    #[test]
    fn prop_sale_order_allow_list_is_complete(
        from in arb_state::<SaleOrderStatus>(),
        to in arb_state::<SaleOrderStatus>(),
        id in arb_uuid(),
    ) {
        check_pair(from, to, id)?;
    }

    /// Terminal states accept no transition at all.
    #[test]
    fn prop_terminal_states_reject_everything(
        from in arb_state::<ChequeStatus>(),
        to in arb_state::<ChequeStatus>(),
    ) {
        prop_assume!(from.is_terminal());
        prop_assert!(StateMachine::validate_transition(Uuid::nil(), from, to, UserId::new()).is_err());
    }

    /// No state may transition to itself.
    #[test]
    fn prop_self_transition_is_rejected(state in arb_state::<ChequeStatus>()) {
        prop_assert!(StateMachine::validate_transition(Uuid::nil(), state, state, UserId::new()).is_err());
    }
}

#[test]
fn every_non_terminal_cheque_state_is_reachable() {
    for state in ChequeStatus::all() {
        let reachable = ChequeStatus::all()
            .iter()
            .any(|from| from.allowed_targets().contains(state));
        assert!(reachable || *state == ChequeStatus::Cartera, "{state} unreachable");
    }
}
