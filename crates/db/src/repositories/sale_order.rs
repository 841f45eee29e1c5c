//! Sale order repository, including the stock it consumes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tesoro_core::OperationError;
use tesoro_shared::types::{OrganizationId, ProductId, SaleOrderId};

use crate::entities::{products, sale_order_items, sale_orders};
use crate::error::storage_error;

/// Sale order repository.
#[derive(Debug, Clone)]
pub struct SaleOrderRepository {
    db: DatabaseConnection,
}

impl SaleOrderRepository {
    /// Creates a new sale order repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a sale order in the organization.
    pub async fn find(
        &self,
        organization_id: OrganizationId,
        sale_order_id: SaleOrderId,
    ) -> Result<sale_orders::Model, OperationError> {
        sale_orders::Entity::find_by_id(sale_order_id.into_inner())
            .filter(sale_orders::Column::OrganizationId.eq(organization_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| OperationError::not_found("sale_order", sale_order_id))
    }

    /// Re-reads and row-locks a sale order.
    pub async fn lock_in(
        &self,
        txn: &DatabaseTransaction,
        organization_id: OrganizationId,
        sale_order_id: SaleOrderId,
    ) -> Result<sale_orders::Model, OperationError> {
        sale_orders::Entity::find_by_id(sale_order_id.into_inner())
            .filter(sale_orders::Column::OrganizationId.eq(organization_id.into_inner()))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| OperationError::not_found("sale_order", sale_order_id))
    }

    /// Line items of a sale order.
    pub async fn items_in(
        &self,
        txn: &DatabaseTransaction,
        sale_order_id: SaleOrderId,
    ) -> Result<Vec<sale_order_items::Model>, OperationError> {
        sale_order_items::Entity::find()
            .filter(sale_order_items::Column::SaleOrderId.eq(sale_order_id.into_inner()))
            .order_by_asc(sale_order_items::Column::ProductId)
            .all(txn)
            .await
            .map_err(storage_error)
    }

    /// Takes `quantity` units out of stock.
    ///
    /// # Errors
    ///
    /// `InsufficientStock` when fewer units are on hand.
    pub async fn decrement_stock_in(
        &self,
        txn: &DatabaseTransaction,
        organization_id: OrganizationId,
        product_id: ProductId,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<products::Model, OperationError> {
        let product = products::Entity::find_by_id(product_id.into_inner())
            .filter(products::Column::OrganizationId.eq(organization_id.into_inner()))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| OperationError::not_found("product", product_id))?;

        if product.stock < quantity {
            return Err(OperationError::InsufficientStock {
                product_id,
                available: product.stock,
                requested: quantity,
            });
        }

        let remaining = product.stock - quantity;
        let mut active: products::ActiveModel = product.into();
        active.stock = Set(remaining);
        active.updated_at = Set(now.fixed_offset());
        active.update(txn).await.map_err(storage_error)
    }

    /// Persists a modified sale order.
    pub async fn update_in(
        &self,
        txn: &DatabaseTransaction,
        order: sale_orders::ActiveModel,
    ) -> Result<sale_orders::Model, OperationError> {
        order.update(txn).await.map_err(storage_error)
    }
}
