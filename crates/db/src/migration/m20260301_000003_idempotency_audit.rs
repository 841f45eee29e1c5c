//! Idempotency records and the audit log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IdempotencyRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(IdempotencyRecords::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(IdempotencyRecords::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(IdempotencyRecords::OperationType).string_len(32).not_null())
                    .col(ColumnDef::new(IdempotencyRecords::IdempotencyKey).string_len(255).not_null())
                    .col(ColumnDef::new(IdempotencyRecords::Status).string_len(16).not_null())
                    .col(ColumnDef::new(IdempotencyRecords::RequestFingerprint).string_len(64).not_null())
                    .col(ColumnDef::new(IdempotencyRecords::ResponsePayload).json())
                    .col(ColumnDef::new(IdempotencyRecords::EntityType).string_len(32))
                    .col(ColumnDef::new(IdempotencyRecords::EntityId).uuid())
                    .col(
                        ColumnDef::new(IdempotencyRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IdempotencyRecords::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(IdempotencyRecords::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // First writer wins: a second IN_PROGRESS insert for the same key fails here.
        manager
            .create_index(
                Index::create()
                    .name("uq_idempotency_records_key")
                    .table(IdempotencyRecords::Table)
                    .col(IdempotencyRecords::OrganizationId)
                    .col(IdempotencyRecords::OperationType)
                    .col(IdempotencyRecords::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_idempotency_records_expiry")
                    .table(IdempotencyRecords::Table)
                    .col(IdempotencyRecords::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditRecords::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuditRecords::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AuditRecords::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(AuditRecords::ActorId).uuid().not_null())
                    .col(ColumnDef::new(AuditRecords::EntityType).string_len(32).not_null())
                    .col(ColumnDef::new(AuditRecords::EntityId).uuid().not_null())
                    .col(ColumnDef::new(AuditRecords::Action).string_len(32).not_null())
                    .col(ColumnDef::new(AuditRecords::FromState).string_len(24))
                    .col(ColumnDef::new(AuditRecords::ToState).string_len(24))
                    .col(ColumnDef::new(AuditRecords::Detail).json().not_null())
                    .col(ColumnDef::new(AuditRecords::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_records_entity")
                    .table(AuditRecords::Table)
                    .col(AuditRecords::EntityType)
                    .col(AuditRecords::EntityId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IdempotencyRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IdempotencyRecords {
    Table,
    Id,
    OrganizationId,
    OperationType,
    IdempotencyKey,
    Status,
    RequestFingerprint,
    ResponsePayload,
    EntityType,
    EntityId,
    CreatedAt,
    CompletedAt,
    ExpiresAt,
}

#[derive(Iden)]
enum AuditRecords {
    Table,
    Id,
    OrganizationId,
    ActorId,
    EntityType,
    EntityId,
    Action,
    FromState,
    ToState,
    Detail,
    CreatedAt,
}
