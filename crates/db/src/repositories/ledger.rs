//! Ledger repository: the persistence half of the balance ledger.
//!
//! Appends lock the account row, read the chain tip, let
//! `tesoro_core::ledger::LedgerService` compute the running balance and
//! insert the next link. The unique `(account_id, sequence)` index turns a
//! lost race into an insert failure; the append is retried once in a fresh
//! savepoint before giving up with `LedgerContention`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tesoro_core::OperationError;
use tesoro_core::document::DocumentType;
use tesoro_core::ledger::{
    AccountBalance, AccountSnapshot, ChainLink, ChainTip, LedgerError, LedgerService, Movement,
    MovementReference, NewMovement, ReconciliationReport, reconcile,
};
use tesoro_shared::types::{AccountId, MovementId, OrganizationId, PageRequest, PageResponse, UserId};
use tracing::{debug, warn};

use crate::entities::{accounts, movements};
use crate::error::{is_unique_violation, storage_error};

/// Appends tried before a lost race becomes `LedgerContention`.
const MAX_APPEND_ATTEMPTS: u32 = 2;

enum AppendFailure {
    LostRace,
    Rejected(OperationError),
}

impl From<OperationError> for AppendFailure {
    fn from(err: OperationError) -> Self {
        Self::Rejected(err)
    }
}

impl From<LedgerError> for AppendFailure {
    fn from(err: LedgerError) -> Self {
        Self::Rejected(err.into())
    }
}

impl From<movements::Model> for Movement {
    fn from(model: movements::Model) -> Self {
        let reference = model
            .document_type
            .as_deref()
            .and_then(DocumentType::parse)
            .zip(model.document_id)
            .map(|(document_type, document_id)| MovementReference {
                document_type,
                document_id,
            });

        Self {
            id: model.id.into(),
            account_id: model.account_id.into(),
            organization_id: model.organization_id.into(),
            sequence: model.sequence,
            direction: model.direction.into(),
            amount: model.amount,
            date: model.date,
            balance_before: model.balance_before,
            balance_after: model.balance_after,
            description: model.description,
            reference,
            cheque_id: model.cheque_id.map(Into::into),
            reverses_movement_id: model.reverses_movement_id.map(Into::into),
        }
    }
}

fn account_snapshot(model: &accounts::Model) -> AccountSnapshot {
    AccountSnapshot {
        id: model.id.into(),
        organization_id: model.organization_id.into(),
        kind: model.kind.into(),
        is_active: model.is_active,
    }
}

/// Ledger repository.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends a movement inside the caller's transaction.
    ///
    /// `reverses` links the new movement to the one it undoes; a reversal is
    /// moved forward to the chain tip's date instead of being rejected as
    /// backdated.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the account is not in the organization
    /// - ledger rule violations from `LedgerService::prepare_append`
    /// - `AlreadyReversed` when `reverses` already has a reversal
    /// - `LedgerContention` after two lost races
    pub async fn append_in(
        &self,
        txn: &DatabaseTransaction,
        organization_id: OrganizationId,
        actor: UserId,
        input: &NewMovement,
        reverses: Option<MovementId>,
        now: DateTime<Utc>,
    ) -> Result<Movement, OperationError> {
        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            let savepoint = txn.begin().await.map_err(storage_error)?;

            match Self::try_append(&savepoint, organization_id, actor, input, reverses, now).await {
                Ok(movement) => {
                    savepoint.commit().await.map_err(storage_error)?;
                    debug!(
                        account_id = %movement.account_id,
                        sequence = movement.sequence,
                        balance_after = %movement.balance_after,
                        "Movement appended"
                    );
                    return Ok(movement);
                }
                Err(AppendFailure::LostRace) => {
                    savepoint.rollback().await.map_err(storage_error)?;
                    warn!(account_id = %input.account_id, attempt, "Lost append race on account");
                }
                Err(AppendFailure::Rejected(err)) => {
                    savepoint.rollback().await.map_err(storage_error)?;
                    return Err(err);
                }
            }
        }

        Err(LedgerError::Contention {
            account_id: input.account_id,
        }
        .into())
    }

    async fn try_append(
        conn: &DatabaseTransaction,
        organization_id: OrganizationId,
        actor: UserId,
        input: &NewMovement,
        reverses: Option<MovementId>,
        now: DateTime<Utc>,
    ) -> Result<Movement, AppendFailure> {
        let account = accounts::Entity::find_by_id(input.account_id.into_inner())
            .filter(accounts::Column::OrganizationId.eq(organization_id.into_inner()))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| OperationError::not_found("account", input.account_id))?;

        if let Some(original) = reverses {
            if Self::is_reversed_in(conn, original).await? {
                return Err(LedgerError::AlreadyReversed(original).into());
            }
        }

        let tip = Self::tip_in(conn, input.account_id).await?;
        let redated;
        let input = match reverses {
            Some(_) => {
                redated = NewMovement {
                    date: LedgerService::reversal_date(input.date, tip.as_ref()),
                    ..input.clone()
                };
                &redated
            }
            None => input,
        };
        let running = LedgerService::prepare_append(&account_snapshot(&account), tip.as_ref(), input)?;

        let model = movements::ActiveModel {
            id: Set(MovementId::new().into_inner()),
            organization_id: Set(organization_id.into_inner()),
            account_id: Set(input.account_id.into_inner()),
            sequence: Set(running.sequence),
            direction: Set(input.direction.into()),
            amount: Set(input.amount),
            date: Set(input.date),
            balance_before: Set(running.balance_before),
            balance_after: Set(running.balance_after),
            description: Set(input.description.clone()),
            document_type: Set(input.reference.map(|r| r.document_type.as_str().to_string())),
            document_id: Set(input.reference.map(|r| r.document_id)),
            cheque_id: Set(input.cheque_id.map(Into::into)),
            reverses_movement_id: Set(reverses.map(Into::into)),
            created_by: Set(actor.into_inner()),
            created_at: Set(now.fixed_offset()),
        };

        match model.insert(conn).await {
            Ok(inserted) => Ok(inserted.into()),
            Err(err) if is_unique_violation(&err) => Err(AppendFailure::LostRace),
            Err(err) => Err(storage_error(err).into()),
        }
    }

    /// Appends the reversal of `movement_id` inside the caller's transaction.
    pub async fn reverse_in(
        &self,
        txn: &DatabaseTransaction,
        organization_id: OrganizationId,
        actor: UserId,
        movement_id: MovementId,
        reason: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Movement, OperationError> {
        let original = self.find_movement_in(txn, organization_id, movement_id).await?;
        let already_reversed = Self::is_reversed_in(txn, movement_id).await?;
        let plan = LedgerService::prepare_reversal(&original, already_reversed, reason)?;

        let input = NewMovement {
            account_id: original.account_id,
            direction: plan.direction,
            amount: plan.amount,
            date: date.max(original.date),
            description: plan.description,
            reference: original.reference,
            cheque_id: original.cheque_id,
        };

        self.append_in(txn, organization_id, actor, &input, Some(movement_id), now)
            .await
    }

    /// Finds a movement in the organization.
    pub async fn find_movement_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: OrganizationId,
        movement_id: MovementId,
    ) -> Result<Movement, OperationError> {
        movements::Entity::find_by_id(movement_id.into_inner())
            .filter(movements::Column::OrganizationId.eq(organization_id.into_inner()))
            .one(conn)
            .await
            .map_err(storage_error)?
            .map(Movement::from)
            .ok_or_else(|| OperationError::not_found("movement", movement_id))
    }

    /// Loads an account without locking it.
    pub async fn account_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: OrganizationId,
        account_id: AccountId,
    ) -> Result<AccountSnapshot, OperationError> {
        accounts::Entity::find_by_id(account_id.into_inner())
            .filter(accounts::Column::OrganizationId.eq(organization_id.into_inner()))
            .one(conn)
            .await
            .map_err(storage_error)?
            .map(|model| account_snapshot(&model))
            .ok_or_else(|| OperationError::not_found("account", account_id))
    }

    /// Current balance of an account: balance-after of its latest movement.
    pub async fn current_balance(
        &self,
        organization_id: OrganizationId,
        account_id: AccountId,
    ) -> Result<AccountBalance, OperationError> {
        self.account_in(&self.db, organization_id, account_id).await?;
        let tip = Self::tip_in(&self.db, account_id).await?;

        Ok(AccountBalance {
            account_id,
            balance: tip.map_or(Decimal::ZERO, |t| t.balance_after),
            movement_count: tip.map_or(0, |t| t.sequence),
            last_movement_date: tip.map(|t| t.date),
        })
    }

    /// Lists an account's movements in chain order.
    pub async fn list_movements(
        &self,
        organization_id: OrganizationId,
        account_id: AccountId,
        page: &PageRequest,
    ) -> Result<PageResponse<Movement>, OperationError> {
        self.account_in(&self.db, organization_id, account_id).await?;
        let page = page.normalized();

        let query = movements::Entity::find()
            .filter(movements::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(movements::Column::Sequence);

        let total = query.clone().count(&self.db).await.map_err(storage_error)?;
        let rows = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(storage_error)?;

        Ok(PageResponse::new(
            rows.into_iter().map(Movement::from).collect(),
            page.page,
            page.per_page,
            total,
        ))
    }

    /// Compares an account's materialized balance with the aggregate of its
    /// movements and verifies every link of the chain.
    pub async fn reconcile(
        &self,
        organization_id: OrganizationId,
        account_id: AccountId,
        epsilon: Decimal,
    ) -> Result<ReconciliationReport, OperationError> {
        self.account_in(&self.db, organization_id, account_id).await?;
        let links = self.chain(account_id).await?;
        Ok(reconcile(account_id, &links, epsilon))
    }

    /// Reconciles every account in every organization.
    pub async fn reconcile_all(&self, epsilon: Decimal) -> Result<Vec<ReconciliationReport>, OperationError> {
        let account_ids: Vec<uuid::Uuid> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(storage_error)?;

        let mut reports = Vec::with_capacity(account_ids.len());
        for id in account_ids {
            let account_id = AccountId::from(id);
            let links = self.chain(account_id).await?;
            reports.push(reconcile(account_id, &links, epsilon));
        }
        Ok(reports)
    }

    async fn chain(&self, account_id: AccountId) -> Result<Vec<ChainLink>, OperationError> {
        let rows = movements::Entity::find()
            .filter(movements::Column::AccountId.eq(account_id.into_inner()))
            .order_by_asc(movements::Column::Sequence)
            .all(&self.db)
            .await
            .map_err(storage_error)?;

        Ok(rows.into_iter().map(|m| Movement::from(m).link()).collect())
    }

    async fn tip_in<C: ConnectionTrait>(conn: &C, account_id: AccountId) -> Result<Option<ChainTip>, OperationError> {
        let latest = movements::Entity::find()
            .filter(movements::Column::AccountId.eq(account_id.into_inner()))
            .order_by_desc(movements::Column::Sequence)
            .one(conn)
            .await
            .map_err(storage_error)?;

        Ok(latest.map(|m| ChainTip {
            sequence: m.sequence,
            balance_after: m.balance_after,
            date: m.date,
        }))
    }

    async fn is_reversed_in<C: ConnectionTrait>(conn: &C, movement_id: MovementId) -> Result<bool, OperationError> {
        let count = movements::Entity::find()
            .filter(movements::Column::ReversesMovementId.eq(movement_id.into_inner()))
            .count(conn)
            .await
            .map_err(storage_error)?;
        Ok(count > 0)
    }
}
