//! Idempotency record storage.
//!
//! The unique index on `(organization_id, operation_type, idempotency_key)`
//! makes the IN_PROGRESS insert the serialization point across retries.
//! Every state change is a conditional write so that two gateways racing on
//! the same record cannot both win.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Set,
};
use serde_json::Value;
use tesoro_core::idempotency::{IdempotencyKey, OperationType, RecordSnapshot};
use tesoro_shared::types::{IdempotencyRecordId, OrganizationId};
use uuid::Uuid;

use crate::entities::{idempotency_records, sea_orm_active_enums::IdempotencyStatus};
use crate::error::is_unique_violation;

/// Input for claiming a key.
#[derive(Debug, Clone)]
pub struct NewIdempotencyRecord<'a> {
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Operation guarded by the key.
    pub operation: OperationType,
    /// Client-supplied key.
    pub key: &'a IdempotencyKey,
    /// Fingerprint of the request body.
    pub fingerprint: &'a str,
    /// Creation instant.
    pub now: DateTime<Utc>,
    /// When the record stops blocking the key.
    pub expires_at: DateTime<Utc>,
}

/// Idempotency record repository.
#[derive(Debug, Clone)]
pub struct IdempotencyRepository {
    db: DatabaseConnection,
}

impl IdempotencyRepository {
    /// Creates a new idempotency repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The connection records are read and claimed through.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Finds the record for a key triple.
    pub async fn find(
        &self,
        organization_id: OrganizationId,
        operation: OperationType,
        key: &IdempotencyKey,
    ) -> Result<Option<idempotency_records::Model>, DbErr> {
        idempotency_records::Entity::find()
            .filter(idempotency_records::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(idempotency_records::Column::OperationType.eq(operation.as_str()))
            .filter(idempotency_records::Column::IdempotencyKey.eq(key.as_str()))
            .one(&self.db)
            .await
    }

    /// Inserts an IN_PROGRESS record.
    ///
    /// Returns `None` when another writer holds the key.
    pub async fn try_insert(
        &self,
        record: NewIdempotencyRecord<'_>,
    ) -> Result<Option<idempotency_records::Model>, DbErr> {
        let model = idempotency_records::ActiveModel {
            id: Set(IdempotencyRecordId::new().into_inner()),
            organization_id: Set(record.organization_id.into_inner()),
            operation_type: Set(record.operation.as_str().to_string()),
            idempotency_key: Set(record.key.as_str().to_string()),
            status: Set(IdempotencyStatus::InProgress),
            request_fingerprint: Set(record.fingerprint.to_string()),
            response_payload: Set(None),
            entity_type: Set(None),
            entity_id: Set(None),
            created_at: Set(record.now.fixed_offset()),
            completed_at: Set(None),
            expires_at: Set(record.expires_at.fixed_offset()),
        };

        match model.insert(&self.db).await {
            Ok(inserted) => Ok(Some(inserted)),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Deletes a record that no longer blocks its key.
    ///
    /// Only expired, FAILED or stale IN_PROGRESS records are deleted; returns
    /// whether this call removed it.
    pub async fn delete_if_reclaimable(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        stale_cutoff: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let reclaimable = Condition::any()
            .add(idempotency_records::Column::ExpiresAt.lte(now.fixed_offset()))
            .add(idempotency_records::Column::Status.eq(IdempotencyStatus::Failed))
            .add(
                Condition::all()
                    .add(idempotency_records::Column::Status.eq(IdempotencyStatus::InProgress))
                    .add(idempotency_records::Column::CreatedAt.lte(stale_cutoff.fixed_offset())),
            );

        let result = idempotency_records::Entity::delete_many()
            .filter(idempotency_records::Column::Id.eq(id))
            .filter(reclaimable)
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Marks an IN_PROGRESS record COMPLETED with its response.
    ///
    /// Runs on `conn` so the completion commits with the work it records.
    /// Returns false when the record is no longer IN_PROGRESS.
    pub async fn complete_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        payload: Value,
        entity: Option<(&'static str, Uuid)>,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let result = idempotency_records::Entity::update_many()
            .set(idempotency_records::ActiveModel {
                status: Set(IdempotencyStatus::Completed),
                response_payload: Set(Some(payload)),
                entity_type: Set(entity.map(|(kind, _)| kind.to_string())),
                entity_id: Set(entity.map(|(_, id)| id)),
                completed_at: Set(Some(now.fixed_offset())),
                ..Default::default()
            })
            .filter(idempotency_records::Column::Id.eq(id))
            .filter(idempotency_records::Column::Status.eq(IdempotencyStatus::InProgress))
            .exec(conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Deletes an IN_PROGRESS record after its work failed.
    pub async fn release(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = idempotency_records::Entity::delete_many()
            .filter(idempotency_records::Column::Id.eq(id))
            .filter(idempotency_records::Column::Status.eq(IdempotencyStatus::InProgress))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Marks IN_PROGRESS records created at or before `cutoff` as FAILED.
    pub async fn fail_stale(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = idempotency_records::Entity::update_many()
            .set(idempotency_records::ActiveModel {
                status: Set(IdempotencyStatus::Failed),
                completed_at: Set(Some(now.fixed_offset())),
                ..Default::default()
            })
            .filter(idempotency_records::Column::Status.eq(IdempotencyStatus::InProgress))
            .filter(idempotency_records::Column::CreatedAt.lte(cutoff.fixed_offset()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Deletes every record whose retention window has passed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = idempotency_records::Entity::delete_many()
            .filter(idempotency_records::Column::ExpiresAt.lte(now.fixed_offset()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

/// The policy view of a stored record.
#[must_use]
pub fn snapshot(model: &idempotency_records::Model) -> RecordSnapshot {
    RecordSnapshot {
        status: model.status.into(),
        fingerprint: model.request_fingerprint.clone(),
        created_at: model.created_at.with_timezone(&Utc),
        expires_at: model.expires_at.with_timezone(&Utc),
    }
}
