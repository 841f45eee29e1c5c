//! Documents and the records the orchestrator reads around them.

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
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clients::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Clients::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Clients::Name).string_len(200).not_null())
                    .col(decimal_column(manager, Clients::CreditLimit))
                    .col(ColumnDef::new(Clients::IsBlocked).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Clients::PaymentTermsDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Clients::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Products::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                    .col(decimal_column(manager, Products::Stock).not_null())
                    .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cheques::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cheques::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Cheques::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Cheques::Number).string_len(64).not_null())
                    .col(ColumnDef::new(Cheques::BankName).string_len(120).not_null())
                    .col(ColumnDef::new(Cheques::Drawer).string_len(200).not_null())
                    .col(decimal_column(manager, Cheques::Amount).not_null())
                    .col(ColumnDef::new(Cheques::DueDate).date().not_null())
                    .col(ColumnDef::new(Cheques::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Cheques::ClientId).uuid())
                    .col(ColumnDef::new(Cheques::DepositAccountId).uuid())
                    .col(ColumnDef::new(Cheques::DepositMovementId).uuid())
                    .col(ColumnDef::new(Cheques::RejectionReason).text())
                    .col(ColumnDef::new(Cheques::Endorsee).string_len(200))
                    .col(ColumnDef::new(Cheques::VoidReason).text())
                    .col(ColumnDef::new(Cheques::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Cheques::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cheques_client")
                            .from(Cheques::Table, Cheques::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleOrders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaleOrders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SaleOrders::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(SaleOrders::ClientId).uuid().not_null())
                    .col(ColumnDef::new(SaleOrders::Number).string_len(64).not_null())
                    .col(ColumnDef::new(SaleOrders::Status).string_len(16).not_null())
                    .col(decimal_column(manager, SaleOrders::Total).not_null())
                    .col(ColumnDef::new(SaleOrders::ConfirmedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SaleOrders::ConfirmedBy).uuid())
                    .col(ColumnDef::new(SaleOrders::InvoiceId).uuid())
                    .col(ColumnDef::new(SaleOrders::MovementId).uuid())
                    .col(ColumnDef::new(SaleOrders::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(SaleOrders::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_orders_client")
                            .from(SaleOrders::Table, SaleOrders::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleOrderItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SaleOrderItems::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SaleOrderItems::SaleOrderId).uuid().not_null())
                    .col(ColumnDef::new(SaleOrderItems::ProductId).uuid().not_null())
                    .col(decimal_column(manager, SaleOrderItems::Quantity).not_null())
                    .col(decimal_column(manager, SaleOrderItems::UnitPrice).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_order_items_order")
                            .from(SaleOrderItems::Table, SaleOrderItems::SaleOrderId)
                            .to(SaleOrders::Table, SaleOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_order_items_product")
                            .from(SaleOrderItems::Table, SaleOrderItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Invoices::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::ClientId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::SaleOrderId).uuid())
                    .col(ColumnDef::new(Invoices::Number).string_len(64).not_null())
                    .col(ColumnDef::new(Invoices::IssueDate).date().not_null())
                    .col(ColumnDef::new(Invoices::DueDate).date().not_null())
                    .col(decimal_column(manager, Invoices::Total).not_null())
                    .col(decimal_column(manager, Invoices::RemainingBalance).not_null())
                    .col(ColumnDef::new(Invoices::Status).string_len(24).not_null())
                    .col(ColumnDef::new(Invoices::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_client")
                            .from(Invoices::Table, Invoices::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_client_status")
                    .table(Invoices::Table)
                    .col(Invoices::ClientId)
                    .col(Invoices::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cheques::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Clients {
    Table,
    Id,
    OrganizationId,
    Name,
    CreditLimit,
    IsBlocked,
    PaymentTermsDays,
    CreatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    OrganizationId,
    Name,
    Stock,
    UpdatedAt,
}

#[derive(Iden)]
enum Cheques {
    Table,
    Id,
    OrganizationId,
    Number,
    BankName,
    Drawer,
    Amount,
    DueDate,
    Status,
    ClientId,
    DepositAccountId,
    DepositMovementId,
    RejectionReason,
    Endorsee,
    VoidReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SaleOrders {
    Table,
    Id,
    OrganizationId,
    ClientId,
    Number,
    Status,
    Total,
    ConfirmedAt,
    ConfirmedBy,
    InvoiceId,
    MovementId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SaleOrderItems {
    Table,
    Id,
    SaleOrderId,
    ProductId,
    Quantity,
    UnitPrice,
}

#[derive(Iden)]
enum Invoices {
    Table,
    Id,
    OrganizationId,
    ClientId,
    SaleOrderId,
    Number,
    IssueDate,
    DueDate,
    Total,
    RemainingBalance,
    Status,
    CreatedAt,
}
