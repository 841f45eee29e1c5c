//! String-backed enums shared by several tables.
//!
//! Columns are plain strings so the schema stays portable; each enum converts
//! to and from its `tesoro_core` counterpart.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tesoro_core::credit;
use tesoro_core::document;
use tesoro_core::idempotency;
use tesoro_core::ledger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AccountKind {
    #[sea_orm(string_value = "CASH")]
    Cash,
    #[sea_orm(string_value = "BANK")]
    Bank,
}

impl From<AccountKind> for ledger::AccountKind {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Cash => Self::Cash,
            AccountKind::Bank => Self::Bank,
        }
    }
}

impl From<ledger::AccountKind> for AccountKind {
    fn from(kind: ledger::AccountKind) -> Self {
        match kind {
            ledger::AccountKind::Cash => Self::Cash,
            ledger::AccountKind::Bank => Self::Bank,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementDirection {
    #[sea_orm(string_value = "INGRESO")]
    Ingreso,
    #[sea_orm(string_value = "EGRESO")]
    Egreso,
}

impl From<MovementDirection> for ledger::Direction {
    fn from(direction: MovementDirection) -> Self {
        match direction {
            MovementDirection::Ingreso => Self::Ingreso,
            MovementDirection::Egreso => Self::Egreso,
        }
    }
}

impl From<ledger::Direction> for MovementDirection {
    fn from(direction: ledger::Direction) -> Self {
        match direction {
            ledger::Direction::Ingreso => Self::Ingreso,
            ledger::Direction::Egreso => Self::Egreso,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum IdempotencyStatus {
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

impl From<IdempotencyStatus> for idempotency::IdempotencyStatus {
    fn from(status: IdempotencyStatus) -> Self {
        match status {
            IdempotencyStatus::InProgress => Self::InProgress,
            IdempotencyStatus::Completed => Self::Completed,
            IdempotencyStatus::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ChequeStatus {
    #[sea_orm(string_value = "CARTERA")]
    Cartera,
    #[sea_orm(string_value = "DEPOSITED")]
    Deposited,
    #[sea_orm(string_value = "CLEARED")]
    Cleared,
    #[sea_orm(string_value = "BOUNCED")]
    Bounced,
    #[sea_orm(string_value = "ENDORSED")]
    Endorsed,
    #[sea_orm(string_value = "VOIDED")]
    Voided,
}

impl From<ChequeStatus> for document::ChequeStatus {
    fn from(status: ChequeStatus) -> Self {
        match status {
            ChequeStatus::Cartera => Self::Cartera,
            ChequeStatus::Deposited => Self::Deposited,
            ChequeStatus::Cleared => Self::Cleared,
            ChequeStatus::Bounced => Self::Bounced,
            ChequeStatus::Endorsed => Self::Endorsed,
            ChequeStatus::Voided => Self::Voided,
        }
    }
}

impl From<document::ChequeStatus> for ChequeStatus {
    fn from(status: document::ChequeStatus) -> Self {
        match status {
            document::ChequeStatus::Cartera => Self::Cartera,
            document::ChequeStatus::Deposited => Self::Deposited,
            document::ChequeStatus::Cleared => Self::Cleared,
            document::ChequeStatus::Bounced => Self::Bounced,
            document::ChequeStatus::Endorsed => Self::Endorsed,
            document::ChequeStatus::Voided => Self::Voided,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SaleOrderStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
}

impl From<SaleOrderStatus> for document::SaleOrderStatus {
    fn from(status: SaleOrderStatus) -> Self {
        match status {
            SaleOrderStatus::Draft => Self::Draft,
            SaleOrderStatus::Confirmed => Self::Confirmed,
        }
    }
}

impl From<document::SaleOrderStatus> for SaleOrderStatus {
    fn from(status: document::SaleOrderStatus) -> Self {
        match status {
            document::SaleOrderStatus::Draft => Self::Draft,
            document::SaleOrderStatus::Confirmed => Self::Confirmed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "ISSUED")]
    Issued,
    #[sea_orm(string_value = "PARTIALLY_COLLECTED")]
    PartiallyCollected,
    #[sea_orm(string_value = "COLLECTED")]
    Collected,
    #[sea_orm(string_value = "VOID")]
    Void,
}

impl From<InvoiceStatus> for credit::InvoiceStatus {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Issued => Self::Issued,
            InvoiceStatus::PartiallyCollected => Self::PartiallyCollected,
            InvoiceStatus::Collected => Self::Collected,
            InvoiceStatus::Void => Self::Void,
        }
    }
}
