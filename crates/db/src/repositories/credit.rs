//! Loads credit profiles and issues invoices.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tesoro_core::OperationError;
use tesoro_core::credit::{ClientCreditInfo, ClientCreditProfile, OpenInvoice};
use tesoro_shared::types::{ClientId, InvoiceId, OrganizationId, SaleOrderId};

use crate::entities::{clients, invoices, sea_orm_active_enums::InvoiceStatus};
use crate::error::storage_error;

/// Input for issuing an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Invoiced client.
    pub client_id: ClientId,
    /// Originating sale order.
    pub sale_order_id: Option<SaleOrderId>,
    /// Invoice number.
    pub number: String,
    /// Issue date.
    pub issue_date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Invoiced total; the whole amount starts outstanding.
    pub total: Decimal,
}

/// Credit repository.
#[derive(Debug, Clone)]
pub struct CreditRepository {
    db: DatabaseConnection,
}

impl CreditRepository {
    /// Creates a new credit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads a client's credit profile outside any transaction.
    pub async fn load_profile(
        &self,
        organization_id: OrganizationId,
        client_id: ClientId,
    ) -> Result<ClientCreditProfile, OperationError> {
        Self::profile_query(&self.db, organization_id, client_id, false).await
    }

    /// Loads a client's credit profile with the client row locked until the
    /// transaction ends, so concurrent confirmations for the same client
    /// evaluate one after the other.
    pub async fn lock_profile_in(
        &self,
        txn: &DatabaseTransaction,
        organization_id: OrganizationId,
        client_id: ClientId,
    ) -> Result<ClientCreditProfile, OperationError> {
        Self::profile_query(txn, organization_id, client_id, true).await
    }

    async fn profile_query<C: ConnectionTrait>(
        conn: &C,
        organization_id: OrganizationId,
        client_id: ClientId,
        lock: bool,
    ) -> Result<ClientCreditProfile, OperationError> {
        let mut query = clients::Entity::find_by_id(client_id.into_inner())
            .filter(clients::Column::OrganizationId.eq(organization_id.into_inner()));
        if lock {
            query = query.lock_exclusive();
        }

        let client = query
            .one(conn)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| OperationError::not_found("client", client_id))?;

        let open_invoices = invoices::Entity::find()
            .filter(invoices::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(invoices::Column::ClientId.eq(client_id.into_inner()))
            .filter(invoices::Column::Status.is_in([InvoiceStatus::Issued, InvoiceStatus::PartiallyCollected]))
            .order_by_asc(invoices::Column::DueDate)
            .all(conn)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(|invoice| OpenInvoice {
                id: invoice.id.into(),
                number: invoice.number,
                due_date: invoice.due_date,
                remaining_balance: invoice.remaining_balance,
                status: invoice.status.into(),
            })
            .collect();

        Ok(ClientCreditProfile {
            client: ClientCreditInfo {
                client_id,
                credit_limit: client.credit_limit,
                is_blocked: client.is_blocked,
            },
            open_invoices,
        })
    }

    /// Finds a client in the organization.
    pub async fn find_client_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: OrganizationId,
        client_id: ClientId,
    ) -> Result<clients::Model, OperationError> {
        clients::Entity::find_by_id(client_id.into_inner())
            .filter(clients::Column::OrganizationId.eq(organization_id.into_inner()))
            .one(conn)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| OperationError::not_found("client", client_id))
    }

    /// Issues an invoice with its full total outstanding.
    pub async fn issue_invoice_in(
        &self,
        txn: &DatabaseTransaction,
        invoice: NewInvoice,
        now: DateTime<Utc>,
    ) -> Result<invoices::Model, OperationError> {
        invoices::ActiveModel {
            id: Set(InvoiceId::new().into_inner()),
            organization_id: Set(invoice.organization_id.into_inner()),
            client_id: Set(invoice.client_id.into_inner()),
            sale_order_id: Set(invoice.sale_order_id.map(Into::into)),
            number: Set(invoice.number),
            issue_date: Set(invoice.issue_date),
            due_date: Set(invoice.due_date),
            total: Set(invoice.total),
            remaining_balance: Set(invoice.total),
            status: Set(InvoiceStatus::Issued),
            created_at: Set(now.fixed_offset()),
        }
        .insert(txn)
        .await
        .map_err(storage_error)
    }
}
