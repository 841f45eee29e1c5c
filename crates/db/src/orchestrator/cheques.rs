//! Cheque lifecycle operations.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tesoro_core::OperationError;
use tesoro_core::document::{
    ChequeAction, ChequeStatus, DepositTarget, DocumentState, DocumentType, StateMachine,
};
use tesoro_core::idempotency::OperationType;
use tesoro_core::ledger::{Direction, Movement, MovementReference, NewMovement};
use tesoro_shared::types::{AccountId, ChequeId, MovementId};
use uuid::Uuid;

use super::{AtomicStep, StepContext};
use crate::entities::cheques;
use crate::repositories::NewAuditRecord;

const ENTITY: &str = "cheque";

/// A cheque action as requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChequeRequest {
    /// Deposit into a bank account.
    Deposit {
        /// Target bank account.
        #[serde(default)]
        account_id: Option<AccountId>,
        /// Value date of the deposit; today when absent.
        #[serde(default)]
        date: Option<NaiveDate>,
    },
    /// Bank confirmed the funds.
    Clear,
    /// Bank rejected the cheque.
    Bounce {
        /// Rejection reason.
        #[serde(default)]
        reason: String,
    },
    /// Pass the cheque on.
    Endorse {
        /// Who receives it.
        #[serde(default)]
        endorsee: String,
    },
    /// Cancel the cheque.
    Void {
        /// Why.
        #[serde(default)]
        reason: String,
    },
    /// Bounced cheque back to portfolio.
    Renegotiate,
}

impl ChequeRequest {
    fn operation(&self) -> OperationType {
        match self {
            Self::Deposit { .. } => OperationType::DepositCheque,
            Self::Clear => OperationType::ClearCheque,
            Self::Bounce { .. } => OperationType::BounceCheque,
            Self::Endorse { .. } => OperationType::EndorseCheque,
            Self::Void { .. } => OperationType::VoidCheque,
            Self::Renegotiate => OperationType::RenegotiateCheque,
        }
    }

    fn action(&self, target: Option<DepositTarget>) -> ChequeAction {
        match self {
            Self::Deposit { .. } => ChequeAction::Deposit { target },
            Self::Clear => ChequeAction::Clear,
            Self::Bounce { reason } => ChequeAction::Bounce { reason: reason.clone() },
            Self::Endorse { endorsee } => ChequeAction::Endorse {
                endorsee: endorsee.clone(),
            },
            Self::Void { reason } => ChequeAction::Void { reason: reason.clone() },
            Self::Renegotiate => ChequeAction::Renegotiate,
        }
    }
}

/// Moves one cheque through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeCommand {
    /// The cheque.
    pub cheque_id: ChequeId,
    /// What to do with it.
    #[serde(flatten)]
    pub request: ChequeRequest,
}

/// The cheque after the action, with the movement it caused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeOutcome {
    /// Updated cheque.
    pub cheque: cheques::Model,
    /// Deposit or rejection movement, if the action moved money.
    pub movement: Option<Movement>,
}

impl ChequeCommand {
    async fn deposit_target(
        &self,
        ctx: &StepContext<'_>,
        from: ChequeStatus,
    ) -> Result<Option<DepositTarget>, OperationError> {
        let ChequeRequest::Deposit {
            account_id: Some(account_id),
            ..
        } = self.request
        else {
            return Ok(None);
        };
        // Unknown accounts only matter once the transition itself is legal.
        if !from.can_transition_to(ChequeStatus::Deposited) {
            return Ok(None);
        }

        let account = ctx
            .repos
            .ledger
            .account_in(ctx.txn, ctx.organization_id, account_id)
            .await?;
        Ok(Some(DepositTarget {
            account_id,
            kind: account.kind,
        }))
    }

    fn movement_input(&self, cheque: &cheques::Model, account_id: AccountId, date: NaiveDate) -> NewMovement {
        NewMovement {
            account_id,
            direction: Direction::Ingreso,
            amount: cheque.amount,
            date,
            description: format!("Deposit of cheque {} ({})", cheque.number, cheque.bank_name),
            reference: Some(MovementReference {
                document_type: DocumentType::Cheque,
                document_id: self.cheque_id.into_inner(),
            }),
            cheque_id: Some(self.cheque_id),
        }
    }
}

#[async_trait]
impl AtomicStep for ChequeCommand {
    type Output = ChequeOutcome;

    fn operation(&self) -> OperationType {
        self.request.operation()
    }

    fn produced_entity(&self, _output: &ChequeOutcome) -> Option<(&'static str, Uuid)> {
        Some((ENTITY, self.cheque_id.into_inner()))
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> Result<ChequeOutcome, OperationError> {
        let cheque = ctx
            .repos
            .cheques
            .lock_in(ctx.txn, ctx.organization_id, self.cheque_id)
            .await?;
        let from = ChequeStatus::from(cheque.status);

        let target = self.deposit_target(ctx, from).await?;
        let action = self.request.action(target);
        let transition = StateMachine::validate_cheque_action(self.cheque_id, from, &action, ctx.actor_id)?;

        let mut movement = None;
        let mut update: cheques::ActiveModel = cheque.clone().into();
        update.status = Set(transition.to.into());
        update.updated_at = Set(ctx.now.fixed_offset());

        match &action {
            ChequeAction::Deposit {
                target: Some(target),
            } => {
                let date = match self.request {
                    ChequeRequest::Deposit { date, .. } => date.unwrap_or(ctx.today),
                    _ => ctx.today,
                };
                let deposit = ctx
                    .repos
                    .ledger
                    .append_in(
                        ctx.txn,
                        ctx.organization_id,
                        ctx.actor_id,
                        &self.movement_input(&cheque, target.account_id, date),
                        None,
                        ctx.now,
                    )
                    .await?;
                update.deposit_account_id = Set(Some(target.account_id.into_inner()));
                update.deposit_movement_id = Set(Some(deposit.id.into_inner()));
                update.rejection_reason = Set(None);
                movement = Some(deposit);
            }
            ChequeAction::Bounce { reason } => {
                let deposit_movement = cheque.deposit_movement_id.ok_or_else(|| {
                    OperationError::Validation(format!("Cheque {} has no deposit movement to reverse", cheque.number))
                })?;
                let rejection = ctx
                    .repos
                    .ledger
                    .reverse_in(
                        ctx.txn,
                        ctx.organization_id,
                        ctx.actor_id,
                        MovementId::from(deposit_movement),
                        &format!("cheque {} rejected: {}", cheque.number, reason.trim()),
                        ctx.today,
                        ctx.now,
                    )
                    .await?;
                update.rejection_reason = Set(Some(reason.trim().to_string()));
                movement = Some(rejection);
            }
            ChequeAction::Endorse { endorsee } => {
                update.endorsee = Set(Some(endorsee.trim().to_string()));
            }
            ChequeAction::Void { reason } => {
                update.void_reason = Set(Some(reason.trim().to_string()));
            }
            ChequeAction::Renegotiate => {
                update.deposit_account_id = Set(None);
                update.deposit_movement_id = Set(None);
                update.rejection_reason = Set(None);
            }
            ChequeAction::Clear | ChequeAction::Deposit { target: None } => {}
        }

        let updated = ctx.repos.cheques.update_in(ctx.txn, update).await?;

        ctx.repos
            .audit
            .record_in(
                ctx.txn,
                NewAuditRecord {
                    organization_id: ctx.organization_id,
                    actor_id: ctx.actor_id,
                    entity_type: ENTITY,
                    entity_id: self.cheque_id.into_inner(),
                    action: self.operation().as_str(),
                    from_state: Some(transition.from.as_str()),
                    to_state: Some(transition.to.as_str()),
                    detail: json!({
                        "amount": cheque.amount,
                        "movement_id": movement.as_ref().map(|m| m.id),
                        "request": self.request,
                    }),
                },
                ctx.now,
            )
            .await?;

        Ok(ChequeOutcome {
            cheque: updated,
            movement,
        })
    }
}
