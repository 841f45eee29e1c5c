//! `SeaORM` entity definitions.
//!
//! One module per table; enums stored as strings live in
//! `sea_orm_active_enums`.

pub mod accounts;
pub mod audit_records;
pub mod cheques;
pub mod clients;
pub mod idempotency_records;
pub mod invoices;
pub mod movements;
pub mod products;
pub mod sale_order_items;
pub mod sale_orders;
pub mod sea_orm_active_enums;
