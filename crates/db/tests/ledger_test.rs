//! Ledger append, reversal and reconciliation against a real schema.

mod common;

use chrono::Duration;
use common::setup;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::ConnectionTrait;
use tesoro_core::OperationError;
use tesoro_core::ledger::{Direction, LedgerError, verify_chain};
use tesoro_db::entities::sea_orm_active_enums::AccountKind;
use tesoro_db::{CreateMovement, ReverseMovement};
use tesoro_shared::types::{AccountId, MovementId, PageRequest};

fn movement(account_id: AccountId, direction: Direction, amount: Decimal) -> CreateMovement {
    CreateMovement {
        account_id,
        direction,
        amount,
        date: None,
        description: "manual entry".to_string(),
        reference: None,
    }
}

#[tokio::test]
async fn appends_form_a_consistent_chain() {
    let env = setup().await;
    let account = env.account(AccountKind::Bank).await;

    let steps = [
        (Direction::Ingreso, dec!(1000)),
        (Direction::Egreso, dec!(250)),
        (Direction::Ingreso, dec!(75)),
        (Direction::Egreso, dec!(2000)),
    ];
    for (direction, amount) in steps {
        env.orchestrator
            .run(&env.ctx(None), &movement(account, direction, amount))
            .await
            .unwrap();
        env.clock.advance(Duration::seconds(1));
    }

    let ledger = &env.orchestrator.repositories().ledger;
    let page = ledger
        .list_movements(env.org_id, account, &PageRequest::default())
        .await
        .unwrap();
    let links: Vec<_> = page.data.iter().map(|m| m.link()).collect();

    assert_eq!(page.meta.total, 4);
    assert!(verify_chain(&links).is_empty());
    assert_eq!(page.data[0].balance_before, Decimal::ZERO);
    assert_eq!(page.data[3].balance_after, dec!(-1175));

    let balance = ledger.current_balance(env.org_id, account).await.unwrap();
    assert_eq!(balance.balance, dec!(-1175));
    assert_eq!(balance.movement_count, 4);

    let report = ledger.reconcile(env.org_id, account, dec!(0.01)).await.unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.aggregate_balance, report.materialized_balance);
}

#[tokio::test]
async fn rejects_non_positive_amounts() {
    let env = setup().await;
    let account = env.account(AccountKind::Cash).await;

    let err = env
        .orchestrator
        .run(&env.ctx(None), &movement(account, Direction::Ingreso, Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(err, OperationError::Ledger(LedgerError::InvalidAmount { .. })));
    let balance = env
        .orchestrator
        .repositories()
        .ledger
        .current_balance(env.org_id, account)
        .await
        .unwrap();
    assert_eq!(balance.movement_count, 0);
}

#[tokio::test]
async fn rejects_backdated_movements() {
    let env = setup().await;
    let account = env.account(AccountKind::Cash).await;

    env.orchestrator
        .run(&env.ctx(None), &movement(account, Direction::Ingreso, dec!(10)))
        .await
        .unwrap();

    let mut backdated = movement(account, Direction::Ingreso, dec!(10));
    backdated.date = Some(env.clock_today() - Duration::days(1));
    let err = env.orchestrator.run(&env.ctx(None), &backdated).await.unwrap_err();

    assert_eq!(err.error_code(), "BACKDATED_MOVEMENT");
}

#[tokio::test]
async fn inactive_and_foreign_accounts_are_rejected() {
    let env = setup().await;
    let inactive = env.account_with(AccountKind::Bank, false).await;

    let err = env
        .orchestrator
        .run(&env.ctx(None), &movement(inactive, Direction::Ingreso, dec!(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::Ledger(LedgerError::AccountInactive(_))));

    let err = env
        .orchestrator
        .run(&env.ctx(None), &movement(AccountId::new(), Direction::Ingreso, dec!(10)))
        .await
        .unwrap_err();
    assert_eq!(err.http_status_code(), 404);
}

#[tokio::test]
async fn a_movement_is_reversed_at_most_once() {
    let env = setup().await;
    let account = env.account(AccountKind::Bank).await;

    let original = env
        .orchestrator
        .run(&env.ctx(None), &movement(account, Direction::Ingreso, dec!(300)))
        .await
        .unwrap()
        .value;

    let reverse = ReverseMovement {
        movement_id: original.id,
        reason: "typo".to_string(),
    };
    let reversal = env.orchestrator.run(&env.ctx(None), &reverse).await.unwrap().value;

    assert_eq!(reversal.direction, Direction::Egreso);
    assert_eq!(reversal.amount, dec!(300));
    assert_eq!(reversal.balance_after, Decimal::ZERO);
    assert_eq!(reversal.reverses_movement_id, Some(original.id));
    assert!(reversal.description.contains("typo"));

    let err = env.orchestrator.run(&env.ctx(None), &reverse).await.unwrap_err();
    assert!(matches!(err, OperationError::Ledger(LedgerError::AlreadyReversed(id)) if id == original.id));

    let err = env
        .orchestrator
        .run(
            &env.ctx(None),
            &ReverseMovement {
                movement_id: MovementId::new(),
                reason: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn movements_are_audited() {
    let env = setup().await;
    let account = env.account(AccountKind::Cash).await;

    let created = env
        .orchestrator
        .run(&env.ctx(None), &movement(account, Direction::Ingreso, dec!(5)))
        .await
        .unwrap()
        .value;

    let trail = env
        .orchestrator
        .repositories()
        .audit
        .list_for_entity(env.org_id, "movement", created.id.into_inner())
        .await
        .unwrap();

    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, "create_movement");
    assert_eq!(trail[0].actor_id, env.user_id.into_inner());
}

#[tokio::test]
async fn reconcile_all_covers_every_account() {
    let env = setup().await;
    let a = env.account(AccountKind::Cash).await;
    let b = env.account(AccountKind::Bank).await;
    for account in [a, b] {
        env.orchestrator
            .run(&env.ctx(None), &movement(account, Direction::Ingreso, dec!(40)))
            .await
            .unwrap();
    }

    let reports = env
        .orchestrator
        .repositories()
        .ledger
        .reconcile_all(dec!(0.01))
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.is_consistent() && r.movement_count == 1));
}

#[tokio::test]
async fn reversal_follows_later_dated_movements() {
    let env = setup().await;
    let account = env.account(AccountKind::Bank).await;
    let ledger = &env.orchestrator.repositories().ledger;

    let original = env
        .orchestrator
        .run(&env.ctx(None), &movement(account, Direction::Ingreso, dec!(300)))
        .await
        .unwrap()
        .value;

    let value_date = env.clock_today() + Duration::days(3);
    env.orchestrator
        .run(
            &env.ctx(None),
            &CreateMovement {
                date: Some(value_date),
                ..movement(account, Direction::Egreso, dec!(50))
            },
        )
        .await
        .unwrap();

    let reversal = env
        .orchestrator
        .run(
            &env.ctx(None),
            &ReverseMovement {
                movement_id: original.id,
                reason: "duplicate".to_string(),
            },
        )
        .await
        .unwrap()
        .value;

    assert_eq!(reversal.date, value_date);
    assert_eq!(reversal.balance_after, dec!(-50));
    assert!(ledger.reconcile(env.org_id, account, dec!(0.01)).await.unwrap().is_consistent());
}

/// Every movement insert also claims its sequence number in a side table, so
/// pre-claiming a number makes the insert fail with a unique violation just
/// like a concurrent writer taking that link would.
async fn reserve_sequence(env: &common::TestEnv, sequence: i64) {
    env.db
        .execute_unprepared("CREATE TABLE sequence_claims (sequence INTEGER NOT NULL UNIQUE)")
        .await
        .unwrap();
    env.db
        .execute_unprepared(
            "CREATE TRIGGER claim_sequence BEFORE INSERT ON movements
             BEGIN
                 INSERT INTO sequence_claims (sequence) VALUES (NEW.sequence);
             END",
        )
        .await
        .unwrap();
    env.db
        .execute_unprepared(&format!("INSERT INTO sequence_claims (sequence) VALUES ({sequence})"))
        .await
        .unwrap();
}

#[tokio::test]
async fn losing_the_append_race_twice_is_contention() {
    let env = setup().await;
    let account = env.account(AccountKind::Bank).await;
    let ledger = &env.orchestrator.repositories().ledger;

    reserve_sequence(&env, 3).await;
    for amount in [dec!(100), dec!(40)] {
        env.orchestrator
            .run(&env.ctx(None), &movement(account, Direction::Ingreso, amount))
            .await
            .unwrap();
    }

    let err = env
        .orchestrator
        .run(&env.ctx(None), &movement(account, Direction::Egreso, dec!(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::Ledger(LedgerError::Contention { account_id }) if account_id == account));
    assert_eq!(err.http_status_code(), 409);
    assert!(err.is_retryable());

    let report = ledger.reconcile(env.org_id, account, dec!(0.01)).await.unwrap();
    assert!(report.is_consistent());
    let balance = ledger.current_balance(env.org_id, account).await.unwrap();
    assert_eq!(balance.movement_count, 2);
    assert_eq!(balance.balance, dec!(140));

    env.db
        .execute_unprepared("DELETE FROM sequence_claims WHERE sequence = 3")
        .await
        .unwrap();
    let appended = env
        .orchestrator
        .run(&env.ctx(None), &movement(account, Direction::Egreso, dec!(10)))
        .await
        .unwrap()
        .value;
    assert_eq!(appended.sequence, 3);
    assert_eq!(appended.balance_before, dec!(140));
}

