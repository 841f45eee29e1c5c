//! Sale order confirmation.

use async_trait::async_trait;
use chrono::Days;
use rust_decimal::Decimal;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tesoro_core::OperationError;
use tesoro_core::credit::{CreditDecision, CreditEvaluator};
use tesoro_core::document::{DocumentState, DocumentType, SaleOrderStatus, StateMachine};
use tesoro_core::idempotency::OperationType;
use tesoro_core::ledger::{Direction, Movement, MovementReference, NewMovement};
use tesoro_shared::types::{AccountId, ClientId, ProductId, SaleOrderId};
use tracing::warn;
use uuid::Uuid;

use super::{AtomicStep, StepContext};
use crate::entities::{invoices, sale_orders};
use crate::repositories::{NewAuditRecord, NewInvoice};

const ENTITY: &str = "sale_order";

/// Confirms a draft sale order.
///
/// With `collect_into` the full total is collected into that account now;
/// otherwise the sale is invoiced on the client's payment terms and the
/// client's credit is evaluated first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmSale {
    /// The order.
    pub sale_order_id: SaleOrderId,
    /// Account receiving immediate payment.
    #[serde(default)]
    pub collect_into: Option<AccountId>,
    /// Proceed despite blocking credit findings.
    #[serde(default)]
    pub credit_override: bool,
}

/// Result of a confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfirmation {
    /// The confirmed order.
    pub sale_order: sale_orders::Model,
    /// Invoice issued for the credit portion.
    pub invoice: Option<invoices::Model>,
    /// Collection movement for the cash portion.
    pub movement: Option<Movement>,
    /// Credit evaluation, when one was needed.
    pub credit: Option<CreditDecision>,
}

#[async_trait]
impl AtomicStep for ConfirmSale {
    type Output = SaleConfirmation;

    fn operation(&self) -> OperationType {
        OperationType::ConfirmSale
    }

    fn produced_entity(&self, _output: &SaleConfirmation) -> Option<(&'static str, Uuid)> {
        Some((ENTITY, self.sale_order_id.into_inner()))
    }

    async fn apply(&self, ctx: &StepContext<'_>) -> Result<SaleConfirmation, OperationError> {
        let order = ctx
            .repos
            .sale_orders
            .lock_in(ctx.txn, ctx.organization_id, self.sale_order_id)
            .await?;

        let transition = StateMachine::validate_transition(
            order.id,
            SaleOrderStatus::from(order.status),
            SaleOrderStatus::Confirmed,
            ctx.actor_id,
        )?;

        let items = ctx.repos.sale_orders.items_in(ctx.txn, self.sale_order_id).await?;
        if items.is_empty() {
            return Err(OperationError::Validation(format!(
                "Sale order {} has no items",
                order.number
            )));
        }

        let client_id = ClientId::from(order.client_id);
        let credit_portion = if self.collect_into.is_some() {
            Decimal::ZERO
        } else {
            order.total
        };

        let credit = if credit_portion > Decimal::ZERO {
            let profile = ctx
                .repos
                .credit
                .lock_profile_in(ctx.txn, ctx.organization_id, client_id)
                .await?;
            let decision = CreditEvaluator::evaluate(&profile, credit_portion, ctx.today, ctx.credit_config);

            if !decision.can_proceed {
                if !(self.credit_override && decision.requires_override) {
                    return Err(OperationError::CreditBlocked {
                        decision: Box::new(decision),
                    });
                }
                warn!(
                    org_id = %ctx.organization_id,
                    client_id = %client_id,
                    actor_id = %ctx.actor_id,
                    "Credit block overridden"
                );
            }
            Some(decision)
        } else {
            None
        };

        for item in &items {
            ctx.repos
                .sale_orders
                .decrement_stock_in(
                    ctx.txn,
                    ctx.organization_id,
                    ProductId::from(item.product_id),
                    item.quantity,
                    ctx.now,
                )
                .await?;
        }

        let reference = MovementReference {
            document_type: DocumentType::SaleOrder,
            document_id: order.id,
        };

        let (movement, invoice) = if let Some(account_id) = self.collect_into {
            let input = NewMovement {
                account_id,
                direction: Direction::Ingreso,
                amount: order.total,
                date: ctx.today,
                description: format!("Collection of sale order {}", order.number),
                reference: Some(reference),
                cheque_id: None,
            };
            let movement = ctx
                .repos
                .ledger
                .append_in(ctx.txn, ctx.organization_id, ctx.actor_id, &input, None, ctx.now)
                .await?;
            (Some(movement), None)
        } else {
            let client = ctx
                .repos
                .credit
                .find_client_in(ctx.txn, ctx.organization_id, client_id)
                .await?;
            let terms = u64::try_from(client.payment_terms_days).unwrap_or(0);
            let due_date = ctx.today.checked_add_days(Days::new(terms)).unwrap_or(ctx.today);

            let invoice = ctx
                .repos
                .credit
                .issue_invoice_in(
                    ctx.txn,
                    NewInvoice {
                        organization_id: ctx.organization_id,
                        client_id,
                        sale_order_id: Some(self.sale_order_id),
                        number: format!("INV-{}", order.number),
                        issue_date: ctx.today,
                        due_date,
                        total: order.total,
                    },
                    ctx.now,
                )
                .await?;
            (None, Some(invoice))
        };

        let mut update: sale_orders::ActiveModel = order.clone().into();
        update.status = Set(transition.to.into());
        update.confirmed_at = Set(Some(ctx.now.fixed_offset()));
        update.confirmed_by = Set(Some(ctx.actor_id.into_inner()));
        update.invoice_id = Set(invoice.as_ref().map(|i| i.id));
        update.movement_id = Set(movement.as_ref().map(|m: &Movement| m.id.into_inner()));
        update.updated_at = Set(ctx.now.fixed_offset());
        let sale_order = ctx.repos.sale_orders.update_in(ctx.txn, update).await?;

        ctx.repos
            .audit
            .record_in(
                ctx.txn,
                NewAuditRecord {
                    organization_id: ctx.organization_id,
                    actor_id: ctx.actor_id,
                    entity_type: ENTITY,
                    entity_id: order.id,
                    action: self.operation().as_str(),
                    from_state: Some(transition.from.as_str()),
                    to_state: Some(transition.to.as_str()),
                    detail: json!({
                        "total": order.total,
                        "items": items.len(),
                        "invoice_id": sale_order.invoice_id,
                        "movement_id": sale_order.movement_id,
                        "credit_override": credit.as_ref().is_some_and(|d| !d.can_proceed),
                    }),
                },
                ctx.now,
            )
            .await?;

        Ok(SaleConfirmation {
            sale_order,
            invoice,
            movement,
            credit,
        })
    }
}
