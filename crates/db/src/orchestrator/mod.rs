//! Transaction orchestrator.
//!
//! Composes the gateway, the state machines, the credit evaluator and the
//! ledger into atomic operations. Each operation is an [`AtomicStep`]; the
//! orchestrator wraps it in the idempotency gateway and runs it in a single
//! storage transaction that also records the idempotent response, so either
//! the effect and its completion record commit together or neither does.

mod cheques;
mod movements;
mod sales;

pub use cheques::{ChequeCommand, ChequeOutcome, ChequeRequest};
pub use movements::{CreateMovement, ReverseMovement};
pub use sales::{ConfirmSale, SaleConfirmation};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tesoro_core::credit::CreditConfig;
use tesoro_core::idempotency::{IdempotencyKey, IdempotencyPolicy, OperationType, Outcome, fingerprint};
use tesoro_core::{OperationError, SharedClock};
use tesoro_shared::types::{OrganizationId, UserId};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::storage_error;
use crate::gateway::{Admission, Claim, IdempotencyGateway, decode, encode};
use crate::repositories::{
    AuditRepository, ChequeRepository, CreditRepository, LedgerRepository, SaleOrderRepository,
};

/// Attempts per operation when storage reports a transient failure.
const MAX_TRANSACTION_ATTEMPTS: u32 = 2;

/// Who is asking, for which organization, under which key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Caller's organization.
    pub organization_id: OrganizationId,
    /// Caller.
    pub actor_id: UserId,
    /// Optional client-supplied idempotency key.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// Repositories available to steps.
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Movements and balances.
    pub ledger: LedgerRepository,
    /// Negotiable instruments.
    pub cheques: ChequeRepository,
    /// Sale orders and stock.
    pub sale_orders: SaleOrderRepository,
    /// Credit profiles and invoices.
    pub credit: CreditRepository,
    /// Audit log.
    pub audit: AuditRepository,
}

impl Repositories {
    /// Builds every repository over one connection.
    #[must_use]
    pub fn new(db: &DatabaseConnection) -> Self {
        Self {
            ledger: LedgerRepository::new(db.clone()),
            cheques: ChequeRepository::new(db.clone()),
            sale_orders: SaleOrderRepository::new(db.clone()),
            credit: CreditRepository::new(db.clone()),
            audit: AuditRepository::new(db.clone()),
        }
    }
}

/// Everything a step may touch while it runs.
pub struct StepContext<'a> {
    /// The operation's transaction.
    pub txn: &'a DatabaseTransaction,
    /// Caller's organization.
    pub organization_id: OrganizationId,
    /// Caller.
    pub actor_id: UserId,
    /// Instant the attempt started.
    pub now: DateTime<Utc>,
    /// Business date of the attempt.
    pub today: NaiveDate,
    /// Repositories.
    pub repos: &'a Repositories,
    /// Credit evaluation settings.
    pub credit_config: &'a CreditConfig,
}

/// One orchestrated operation.
///
/// The step itself is the request: it is fingerprinted for the idempotency
/// gateway, so it must serialize every field that changes the effect.
#[async_trait]
pub trait AtomicStep: Serialize + Send + Sync {
    /// Response returned to the caller and stored for replay.
    type Output: Serialize + DeserializeOwned + Send;

    /// Operation type the step is recorded under.
    fn operation(&self) -> OperationType;

    /// Entity the step produced, recorded on the idempotency record.
    fn produced_entity(&self, output: &Self::Output) -> Option<(&'static str, Uuid)>;

    /// Performs the step inside `ctx.txn`.
    async fn apply(&self, ctx: &StepContext<'_>) -> Result<Self::Output, OperationError>;
}

/// Runs steps atomically behind the idempotency gateway.
#[derive(Debug, Clone)]
pub struct TransactionOrchestrator {
    db: DatabaseConnection,
    gateway: IdempotencyGateway,
    repos: Repositories,
    clock: SharedClock,
    credit_config: CreditConfig,
}

impl TransactionOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        policy: IdempotencyPolicy,
        credit_config: CreditConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            gateway: IdempotencyGateway::new(db.clone(), policy, clock.clone()),
            repos: Repositories::new(&db),
            db,
            clock,
            credit_config,
        }
    }

    /// The repositories steps run against.
    #[must_use]
    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// The idempotency gateway.
    #[must_use]
    pub fn gateway(&self) -> &IdempotencyGateway {
        &self.gateway
    }

    /// Credit settings applied to credit-sensitive steps.
    #[must_use]
    pub fn credit_config(&self) -> &CreditConfig {
        &self.credit_config
    }

    /// The clock attempts are stamped with.
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Runs `step` exactly once per idempotency key.
    pub async fn run<S: AtomicStep>(
        &self,
        ctx: &OperationContext,
        step: &S,
    ) -> Result<Outcome<S::Output>, OperationError> {
        let operation = step.operation();

        let Some(key) = ctx.idempotency_key.clone() else {
            let value = self.run_with_retry(ctx, step, None).await?;
            return Ok(Outcome::fresh(value, None));
        };

        let request_fingerprint = fingerprint(operation, step)?;
        let claim = match self
            .gateway
            .admit(ctx.organization_id, operation, &key, &request_fingerprint)
            .await?
        {
            Admission::Replay(payload) => return Ok(Outcome::replayed(decode(payload)?, key)),
            Admission::Claimed(claim) => claim,
        };

        match self.run_with_retry(ctx, step, Some(&claim)).await {
            Ok(value) => Ok(Outcome::fresh(value, Some(key))),
            Err(err) => {
                self.gateway.release(&claim).await;
                Err(err)
            }
        }
    }

    async fn run_with_retry<S: AtomicStep>(
        &self,
        ctx: &OperationContext,
        step: &S,
        claim: Option<&Claim>,
    ) -> Result<S::Output, OperationError> {
        let mut attempt = 1;
        loop {
            match self.attempt(ctx, step, claim).await {
                Err(err) if err.is_transient() && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    warn!(operation = %step.operation(), attempt, error = %err, "Transient storage failure, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn attempt<S: AtomicStep>(
        &self,
        ctx: &OperationContext,
        step: &S,
        claim: Option<&Claim>,
    ) -> Result<S::Output, OperationError> {
        let txn = self.db.begin().await.map_err(storage_error)?;
        let now = self.clock.now();
        let step_ctx = StepContext {
            txn: &txn,
            organization_id: ctx.organization_id,
            actor_id: ctx.actor_id,
            now,
            today: now.date_naive(),
            repos: &self.repos,
            credit_config: &self.credit_config,
        };

        let result: Result<S::Output, OperationError> = async {
            let output = step.apply(&step_ctx).await?;
            if let Some(claim) = claim {
                self.gateway
                    .complete_in(&txn, claim, encode(&output)?, step.produced_entity(&output))
                    .await?;
            }
            Ok(output)
        }
        .await;

        match result {
            Ok(output) => {
                txn.commit().await.map_err(storage_error)?;
                info!(
                    org_id = %ctx.organization_id,
                    operation = %step.operation(),
                    "Operation committed"
                );
                Ok(output)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}
