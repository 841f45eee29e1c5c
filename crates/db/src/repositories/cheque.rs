//! Cheque repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect,
};
use tesoro_core::OperationError;
use tesoro_shared::types::{ChequeId, OrganizationId};

use crate::entities::cheques;
use crate::error::storage_error;

/// Cheque repository.
#[derive(Debug, Clone)]
pub struct ChequeRepository {
    db: DatabaseConnection,
}

impl ChequeRepository {
    /// Creates a new cheque repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a cheque in the organization.
    pub async fn find(
        &self,
        organization_id: OrganizationId,
        cheque_id: ChequeId,
    ) -> Result<cheques::Model, OperationError> {
        Self::find_query(organization_id, cheque_id, &self.db, false).await
    }

    /// Re-reads and row-locks a cheque for the rest of the transaction.
    pub async fn lock_in(
        &self,
        txn: &DatabaseTransaction,
        organization_id: OrganizationId,
        cheque_id: ChequeId,
    ) -> Result<cheques::Model, OperationError> {
        Self::find_query(organization_id, cheque_id, txn, true).await
    }

    /// Persists a modified cheque.
    pub async fn update_in(
        &self,
        txn: &DatabaseTransaction,
        cheque: cheques::ActiveModel,
    ) -> Result<cheques::Model, OperationError> {
        cheque.update(txn).await.map_err(storage_error)
    }

    async fn find_query<C: ConnectionTrait>(
        organization_id: OrganizationId,
        cheque_id: ChequeId,
        conn: &C,
        lock: bool,
    ) -> Result<cheques::Model, OperationError> {
        let mut query = cheques::Entity::find_by_id(cheque_id.into_inner())
            .filter(cheques::Column::OrganizationId.eq(organization_id.into_inner()));
        if lock {
            query = query.lock_exclusive();
        }

        query
            .one(conn)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| OperationError::not_found("cheque", cheque_id))
    }
}
