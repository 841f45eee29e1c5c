//! Cheque lifecycle through the orchestrator.

mod common;

use chrono::Duration;
use common::{TestEnv, setup};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tesoro_core::OperationError;
use tesoro_core::document::TransitionError;
use tesoro_core::ledger::{Direction, verify_chain};
use tesoro_db::entities::sea_orm_active_enums::{AccountKind, ChequeStatus};
use tesoro_db::{ChequeCommand, ChequeOutcome, ChequeRequest, CreateMovement, ReverseMovement};
use tesoro_shared::types::{AccountId, ChequeId, PageRequest};

async fn act(env: &TestEnv, cheque_id: ChequeId, request: ChequeRequest) -> Result<ChequeOutcome, OperationError> {
    env.orchestrator
        .run(&env.ctx(None), &ChequeCommand { cheque_id, request })
        .await
        .map(|outcome| outcome.value)
}

fn deposit_into(account_id: AccountId) -> ChequeRequest {
    ChequeRequest::Deposit {
        account_id: Some(account_id),
        date: None,
    }
}

async fn balance(env: &TestEnv, account_id: AccountId) -> Decimal {
    env.orchestrator
        .repositories()
        .ledger
        .current_balance(env.org_id, account_id)
        .await
        .unwrap()
        .balance
}

#[tokio::test]
async fn deposit_then_bounce_restores_the_balance() {
    let env = setup().await;
    let bank = env.account(AccountKind::Bank).await;
    let cheque = env.cheque(dec!(5000)).await;

    assert_eq!(balance(&env, bank).await, Decimal::ZERO);

    let deposited = act(&env, cheque, deposit_into(bank)).await.unwrap();
    let deposit = deposited.movement.unwrap();
    assert_eq!(deposited.cheque.status, ChequeStatus::Deposited);
    assert_eq!(deposited.cheque.deposit_account_id, Some(bank.into_inner()));
    assert_eq!(deposited.cheque.deposit_movement_id, Some(deposit.id.into_inner()));
    assert_eq!(deposit.direction, Direction::Ingreso);
    assert_eq!(deposit.cheque_id, Some(cheque));
    assert_eq!(balance(&env, bank).await, dec!(5000));

    env.clock.advance(Duration::days(1));
    let bounced = act(
        &env,
        cheque,
        ChequeRequest::Bounce {
            reason: "insufficient funds".to_string(),
        },
    )
    .await
    .unwrap();
    let rejection = bounced.movement.unwrap();
    assert_eq!(bounced.cheque.status, ChequeStatus::Bounced);
    assert_eq!(bounced.cheque.rejection_reason.as_deref(), Some("insufficient funds"));
    assert_eq!(rejection.direction, Direction::Egreso);
    assert_eq!(rejection.reverses_movement_id, Some(deposit.id));
    assert_eq!(rejection.date, env.clock_today());
    assert_eq!(balance(&env, bank).await, Decimal::ZERO);

    let trail = env
        .orchestrator
        .repositories()
        .audit
        .list_for_entity(env.org_id, "cheque", cheque.into_inner())
        .await
        .unwrap();
    let transitions: Vec<_> = trail
        .iter()
        .map(|r| (r.from_state.as_deref(), r.to_state.as_deref()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (Some("CARTERA"), Some("DEPOSITED")),
            (Some("DEPOSITED"), Some("BOUNCED")),
        ]
    );
}

#[tokio::test]
async fn invalid_transition_leaves_everything_unchanged() {
    let env = setup().await;
    let cheque = env.cheque(dec!(100)).await;

    let err = act(&env, cheque, ChequeRequest::Clear).await.unwrap_err();
    assert!(matches!(
        err,
        OperationError::Transition(TransitionError::InvalidTransition {
            from: "CARTERA",
            to: "CLEARED",
            ..
        })
    ));
    assert_eq!(err.http_status_code(), 409);

    let stored = env.orchestrator.repositories().cheques.find(env.org_id, cheque).await.unwrap();
    assert_eq!(stored.status, ChequeStatus::Cartera);

    let trail = env
        .orchestrator
        .repositories()
        .audit
        .list_for_entity(env.org_id, "cheque", cheque.into_inner())
        .await
        .unwrap();
    assert!(trail.is_empty());
}

#[tokio::test]
async fn deposit_needs_a_bank_account() {
    let env = setup().await;
    let cash = env.account(AccountKind::Cash).await;
    let cheque = env.cheque(dec!(100)).await;

    let err = act(
        &env,
        cheque,
        ChequeRequest::Deposit {
            account_id: None,
            date: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "MISSING_TRANSITION_DATA");

    let err = act(&env, cheque, deposit_into(cash)).await.unwrap_err();
    assert!(matches!(
        err,
        OperationError::Transition(TransitionError::InvalidDepositTarget { .. })
    ));
    assert_eq!(balance(&env, cash).await, Decimal::ZERO);
}

#[tokio::test]
async fn terminal_states_accept_nothing() {
    let env = setup().await;
    let bank = env.account(AccountKind::Bank).await;
    let cheque = env.cheque(dec!(100)).await;

    act(
        &env,
        cheque,
        ChequeRequest::Endorse {
            endorsee: "Proveedor SA".to_string(),
        },
    )
    .await
    .unwrap();

    for request in [
        deposit_into(bank),
        ChequeRequest::Void {
            reason: "lost".to_string(),
        },
        ChequeRequest::Renegotiate,
    ] {
        let err = act(&env, cheque, request).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
    }
}

#[tokio::test]
async fn void_requires_a_reason() {
    let env = setup().await;
    let cheque = env.cheque(dec!(100)).await;

    let err = act(&env, cheque, ChequeRequest::Void { reason: "  ".to_string() })
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "MISSING_TRANSITION_DATA");

    let voided = act(
        &env,
        cheque,
        ChequeRequest::Void {
            reason: "torn".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(voided.cheque.status, ChequeStatus::Voided);
    assert_eq!(voided.cheque.void_reason.as_deref(), Some("torn"));
    assert!(voided.movement.is_none());
}

#[tokio::test]
async fn renegotiated_cheque_can_be_deposited_again() {
    let env = setup().await;
    let bank = env.account(AccountKind::Bank).await;
    let cheque = env.cheque(dec!(800)).await;

    act(&env, cheque, deposit_into(bank)).await.unwrap();
    act(
        &env,
        cheque,
        ChequeRequest::Bounce {
            reason: "signature mismatch".to_string(),
        },
    )
    .await
    .unwrap();

    let back = act(&env, cheque, ChequeRequest::Renegotiate).await.unwrap();
    assert_eq!(back.cheque.status, ChequeStatus::Cartera);
    assert_eq!(back.cheque.deposit_account_id, None);
    assert_eq!(back.cheque.rejection_reason, None);

    act(&env, cheque, deposit_into(bank)).await.unwrap();
    let cleared = act(&env, cheque, ChequeRequest::Clear).await.unwrap();
    assert_eq!(cleared.cheque.status, ChequeStatus::Cleared);
    assert_eq!(balance(&env, bank).await, dec!(800));

    let report = env
        .orchestrator
        .repositories()
        .ledger
        .reconcile(env.org_id, bank, dec!(0.01))
        .await
        .unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.movement_count, 3);
}

#[tokio::test]
async fn bounce_after_a_later_dated_movement_lands_on_the_latest_date() {
    let env = setup().await;
    let bank = env.account(AccountKind::Bank).await;
    let cheque = env.cheque(dec!(5000)).await;
    act(&env, cheque, deposit_into(bank)).await.unwrap();

    let post_dated = env.clock_today() + Duration::days(5);
    env.orchestrator
        .run(
            &env.ctx(None),
            &CreateMovement {
                account_id: bank,
                direction: Direction::Ingreso,
                amount: dec!(100),
                date: Some(post_dated),
                description: "scheduled transfer".to_string(),
                reference: None,
            },
        )
        .await
        .unwrap();

    let bounced = act(
        &env,
        cheque,
        ChequeRequest::Bounce {
            reason: "account closed".to_string(),
        },
    )
    .await
    .unwrap();

    let rejection = bounced.movement.unwrap();
    assert_eq!(bounced.cheque.status, ChequeStatus::Bounced);
    assert_eq!(rejection.date, post_dated);
    assert_eq!(rejection.sequence, 3);
    assert_eq!(balance(&env, bank).await, dec!(100));

    let page = env
        .orchestrator
        .repositories()
        .ledger
        .list_movements(env.org_id, bank, &PageRequest::default())
        .await
        .unwrap();
    let links: Vec<_> = page.data.iter().map(|m| m.link()).collect();
    assert!(verify_chain(&links).is_empty());
}

#[tokio::test]
async fn cheque_movements_are_only_reversed_through_the_cheque() {
    let env = setup().await;
    let bank = env.account(AccountKind::Bank).await;
    let cheque = env.cheque(dec!(5000)).await;
    let deposit = act(&env, cheque, deposit_into(bank)).await.unwrap().movement.unwrap();

    let err = env
        .orchestrator
        .run(
            &env.ctx(None),
            &ReverseMovement {
                movement_id: deposit.id,
                reason: "undo".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "DOCUMENT_LINKED_MOVEMENT");
    assert_eq!(err.http_status_code(), 409);
    assert_eq!(balance(&env, bank).await, dec!(5000));

    let bounced = act(
        &env,
        cheque,
        ChequeRequest::Bounce {
            reason: "signature mismatch".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(bounced.movement.unwrap().reverses_movement_id, Some(deposit.id));
    assert_eq!(balance(&env, bank).await, Decimal::ZERO);
}
