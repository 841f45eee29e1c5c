//! Accounts and the movement chain.
//!
//! `(account_id, sequence)` is unique so a writer that lost the append race
//! fails at insert time; `reverses_movement_id` is unique so a movement can
//! be reversed at most once.

use sea_orm_migration::prelude::*;

use super::decimal_column;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Accounts::Name).string_len(120).not_null())
                    .col(ColumnDef::new(Accounts::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(Accounts::IsActive).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_org")
                    .table(Accounts::Table)
                    .col(Accounts::OrganizationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movements::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Movements::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Movements::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Movements::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Movements::Sequence).big_integer().not_null())
                    .col(ColumnDef::new(Movements::Direction).string_len(16).not_null())
                    .col(decimal_column(manager, Movements::Amount).not_null())
                    .col(ColumnDef::new(Movements::Date).date().not_null())
                    .col(decimal_column(manager, Movements::BalanceBefore).not_null())
                    .col(decimal_column(manager, Movements::BalanceAfter).not_null())
                    .col(ColumnDef::new(Movements::Description).text().not_null())
                    .col(ColumnDef::new(Movements::DocumentType).string_len(32))
                    .col(ColumnDef::new(Movements::DocumentId).uuid())
                    .col(ColumnDef::new(Movements::ChequeId).uuid())
                    .col(ColumnDef::new(Movements::ReversesMovementId).uuid().unique_key())
                    .col(ColumnDef::new(Movements::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Movements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movements_account")
                            .from(Movements::Table, Movements::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_movements_account_sequence")
                    .table(Movements::Table)
                    .col(Movements::AccountId)
                    .col(Movements::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movements_cheque")
                    .table(Movements::Table)
                    .col(Movements::ChequeId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Movements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    OrganizationId,
    Name,
    Kind,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum Movements {
    Table,
    Id,
    OrganizationId,
    AccountId,
    Sequence,
    Direction,
    Amount,
    Date,
    BalanceBefore,
    BalanceAfter,
    Description,
    DocumentType,
    DocumentId,
    ChequeId,
    ReversesMovementId,
    CreatedBy,
    CreatedAt,
}
