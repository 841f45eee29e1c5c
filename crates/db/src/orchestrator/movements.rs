//! Manual ledger entries and their reversals.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tesoro_core::OperationError;
use tesoro_core::idempotency::OperationType;
use tesoro_core::ledger::{Direction, LedgerService, Movement, MovementReference, NewMovement};
use tesoro_shared::types::{AccountId, MovementId};
use uuid::Uuid;

use super::{AtomicStep, StepContext};
use crate::repositories::NewAuditRecord;

const ENTITY: &str = "movement";

/// Appends a manual movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMovement {
    /// Target account.
    pub account_id: AccountId,
    /// In or out.
    pub direction: Direction,
    /// Strictly positive amount.
    pub amount: Decimal,
    /// Value date; today when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Free text.
    pub description: String,
    /// Originating document, if any.
    #[serde(default)]
    pub reference: Option<MovementReference>,
}

#[async_trait]
impl AtomicStep for CreateMovement {
    type Output = Movement;

    fn operation(&self) -> OperationType {
        OperationType::CreateMovement
    }

    fn produced_entity(&self, output: &Movement) -> Option<(&'static str, Uuid)> {
        Some((ENTITY, output.id.into_inner()))
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> Result<Movement, OperationError> {
        let input = NewMovement {
            account_id: self.account_id,
            direction: self.direction,
            amount: self.amount,
            date: self.date.unwrap_or(ctx.today),
            description: self.description.clone(),
            reference: self.reference,
            cheque_id: None,
        };

        let movement = ctx
            .repos
            .ledger
            .append_in(ctx.txn, ctx.organization_id, ctx.actor_id, &input, None, ctx.now)
            .await?;

        ctx.repos
            .audit
            .record_in(
                ctx.txn,
                NewAuditRecord {
                    organization_id: ctx.organization_id,
                    actor_id: ctx.actor_id,
                    entity_type: ENTITY,
                    entity_id: movement.id.into_inner(),
                    action: self.operation().as_str(),
                    from_state: None,
                    to_state: None,
                    detail: json!({
                        "account_id": movement.account_id,
                        "direction": movement.direction,
                        "amount": movement.amount,
                        "balance_after": movement.balance_after,
                    }),
                },
                ctx.now,
            )
            .await?;

        Ok(movement)
    }
}

/// Appends the reversal of an existing movement.
///
/// Movements owned by a cheque or a sale order are reversed through that
/// document instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseMovement {
    /// Movement to undo.
    pub movement_id: MovementId,
    /// Why it is undone.
    #[serde(default)]
    pub reason: String,
}

#[async_trait]
impl AtomicStep for ReverseMovement {
    type Output = Movement;

    fn operation(&self) -> OperationType {
        OperationType::ReverseMovement
    }

    fn produced_entity(&self, output: &Movement) -> Option<(&'static str, Uuid)> {
        Some((ENTITY, output.id.into_inner()))
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> Result<Movement, OperationError> {
        let original = ctx
            .repos
            .ledger
            .find_movement_in(ctx.txn, ctx.organization_id, self.movement_id)
            .await?;
        LedgerService::require_unlinked(&original)?;

        let reversal = ctx
            .repos
            .ledger
            .reverse_in(
                ctx.txn,
                ctx.organization_id,
                ctx.actor_id,
                self.movement_id,
                &self.reason,
                ctx.today,
                ctx.now,
            )
            .await?;

        ctx.repos
            .audit
            .record_in(
                ctx.txn,
                NewAuditRecord {
                    organization_id: ctx.organization_id,
                    actor_id: ctx.actor_id,
                    entity_type: ENTITY,
                    entity_id: self.movement_id.into_inner(),
                    action: self.operation().as_str(),
                    from_state: None,
                    to_state: None,
                    detail: json!({
                        "reversal_id": reversal.id,
                        "amount": reversal.amount,
                        "reason": self.reason,
                    }),
                },
                ctx.now,
            )
            .await?;

        Ok(reversal)
    }
}
