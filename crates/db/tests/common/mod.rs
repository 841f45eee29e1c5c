//! Shared fixtures for the database integration tests.
//!
//! Every test gets a fresh in-memory SQLite database with the real
//! migrations applied. The pool holds a single connection so the in-memory
//! database survives for the whole test.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tesoro_core::credit::CreditConfig;
use tesoro_core::idempotency::{IdempotencyKey, IdempotencyPolicy};
use tesoro_core::{Clock, ManualClock, SharedClock};
use tesoro_db::entities::{
    accounts, cheques, clients, invoices, products, sale_order_items, sale_orders,
    sea_orm_active_enums::{AccountKind, ChequeStatus, InvoiceStatus, SaleOrderStatus},
};
use tesoro_db::migration::Migrator;
use tesoro_db::{OperationContext, TransactionOrchestrator};
use tesoro_shared::types::{
    AccountId, ChequeId, ClientId, OrganizationId, ProductId, SaleOrderId, UserId,
};
use uuid::Uuid;

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub clock: Arc<ManualClock>,
    pub orchestrator: TransactionOrchestrator,
    pub org_id: OrganizationId,
    pub user_id: UserId,
}

pub fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-07-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub async fn setup() -> TestEnv {
    setup_with(CreditConfig::default()).await
}

pub async fn setup_with(credit_config: CreditConfig) -> TestEnv {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let clock = Arc::new(ManualClock::new(start()));
    let shared: SharedClock = clock.clone();
    let orchestrator = TransactionOrchestrator::new(
        db.clone(),
        IdempotencyPolicy::default(),
        credit_config,
        shared,
    );

    TestEnv {
        db,
        clock,
        orchestrator,
        org_id: OrganizationId::new(),
        user_id: UserId::new(),
    }
}

impl TestEnv {
    pub fn ctx(&self, key: Option<&str>) -> OperationContext {
        OperationContext {
            organization_id: self.org_id,
            actor_id: self.user_id,
            idempotency_key: IdempotencyKey::parse(key).unwrap(),
        }
    }

    pub fn shared_clock(&self) -> SharedClock {
        self.clock.clone()
    }

    pub fn clock_today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn account(&self, kind: AccountKind) -> AccountId {
        self.account_with(kind, true).await
    }

    pub async fn account_with(&self, kind: AccountKind, is_active: bool) -> AccountId {
        let id = Uuid::new_v4();
        accounts::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id.into_inner()),
            name: Set(format!("{kind:?} account")),
            kind: Set(kind),
            is_active: Set(is_active),
            created_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        AccountId::from(id)
    }

    pub async fn client(&self, credit_limit: Option<Decimal>, is_blocked: bool) -> ClientId {
        let id = Uuid::new_v4();
        clients::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id.into_inner()),
            name: Set("ACME".to_string()),
            credit_limit: Set(credit_limit),
            is_blocked: Set(is_blocked),
            payment_terms_days: Set(30),
            created_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        ClientId::from(id)
    }

    pub async fn invoice(&self, client_id: ClientId, remaining: Decimal, days_overdue: i64) -> Uuid {
        let id = Uuid::new_v4();
        let due_date = start().date_naive() - chrono::Duration::days(days_overdue);
        invoices::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id.into_inner()),
            client_id: Set(client_id.into_inner()),
            sale_order_id: Set(None),
            number: Set(format!("F-{id}")),
            issue_date: Set(due_date - chrono::Duration::days(30)),
            due_date: Set(due_date),
            total: Set(remaining),
            remaining_balance: Set(remaining),
            status: Set(InvoiceStatus::Issued),
            created_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        id
    }

    pub async fn cheque(&self, amount: Decimal) -> ChequeId {
        let id = Uuid::new_v4();
        cheques::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id.into_inner()),
            number: Set("00012345".to_string()),
            bank_name: Set("Banco Nacion".to_string()),
            drawer: Set("Juan Perez".to_string()),
            amount: Set(amount),
            due_date: Set(start().date_naive()),
            status: Set(ChequeStatus::Cartera),
            client_id: Set(None),
            deposit_account_id: Set(None),
            deposit_movement_id: Set(None),
            rejection_reason: Set(None),
            endorsee: Set(None),
            void_reason: Set(None),
            created_at: Set(start().fixed_offset()),
            updated_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        ChequeId::from(id)
    }

    pub async fn product(&self, stock: Decimal) -> ProductId {
        let id = Uuid::new_v4();
        products::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id.into_inner()),
            name: Set("Widget".to_string()),
            stock: Set(stock),
            updated_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        ProductId::from(id)
    }

    /// A draft order with one line of `quantity` units at `unit_price`.
    pub async fn sale_order(
        &self,
        client_id: ClientId,
        product_id: ProductId,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> SaleOrderId {
        let id = Uuid::new_v4();
        sale_orders::ActiveModel {
            id: Set(id),
            organization_id: Set(self.org_id.into_inner()),
            client_id: Set(client_id.into_inner()),
            number: Set("SO-0001".to_string()),
            status: Set(SaleOrderStatus::Draft),
            total: Set(quantity * unit_price),
            confirmed_at: Set(None),
            confirmed_by: Set(None),
            invoice_id: Set(None),
            movement_id: Set(None),
            created_at: Set(start().fixed_offset()),
            updated_at: Set(start().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .unwrap();

        sale_order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_order_id: Set(id),
            product_id: Set(product_id.into_inner()),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
        }
        .insert(&self.db)
        .await
        .unwrap();

        SaleOrderId::from(id)
    }
}