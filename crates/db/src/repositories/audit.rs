//! Append-only audit log of orchestrated operations.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;
use tesoro_core::OperationError;
use tesoro_shared::types::{OrganizationId, UserId};
use uuid::Uuid;

use crate::entities::audit_records;
use crate::error::storage_error;

/// One audit entry.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Who performed the operation.
    pub actor_id: UserId,
    /// Kind of entity touched.
    pub entity_type: &'static str,
    /// The entity.
    pub entity_id: Uuid,
    /// Operation name.
    pub action: &'static str,
    /// State before, for lifecycle transitions.
    pub from_state: Option<&'static str>,
    /// State after, for lifecycle transitions.
    pub to_state: Option<&'static str>,
    /// Amounts, linked ids and other operation detail.
    pub detail: Value,
}

/// Audit repository.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Writes an audit entry on `conn`.
    pub async fn record_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        record: NewAuditRecord,
        now: DateTime<Utc>,
    ) -> Result<audit_records::Model, OperationError> {
        audit_records::ActiveModel {
            id: Set(Uuid::now_v7()),
            organization_id: Set(record.organization_id.into_inner()),
            actor_id: Set(record.actor_id.into_inner()),
            entity_type: Set(record.entity_type.to_string()),
            entity_id: Set(record.entity_id),
            action: Set(record.action.to_string()),
            from_state: Set(record.from_state.map(str::to_string)),
            to_state: Set(record.to_state.map(str::to_string)),
            detail: Set(record.detail),
            created_at: Set(now.fixed_offset()),
        }
        .insert(conn)
        .await
        .map_err(storage_error)
    }

    /// Audit trail of one entity, oldest first.
    pub async fn list_for_entity(
        &self,
        organization_id: OrganizationId,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<audit_records::Model>, OperationError> {
        audit_records::Entity::find()
            .filter(audit_records::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(audit_records::Column::EntityType.eq(entity_type))
            .filter(audit_records::Column::EntityId.eq(entity_id))
            .order_by_asc(audit_records::Column::CreatedAt)
            .order_by_asc(audit_records::Column::Id)
            .all(&self.db)
            .await
            .map_err(storage_error)
    }
}
