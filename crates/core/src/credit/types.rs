//! Credit domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tesoro_shared::config::CreditSettings;
use tesoro_shared::types::{ClientId, InvoiceId};

/// Invoice collection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Issued, nothing collected.
    Issued,
    /// Partly collected.
    PartiallyCollected,
    /// Fully collected.
    Collected,
    /// Cancelled.
    Void,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "ISSUED",
            Self::PartiallyCollected => "PARTIALLY_COLLECTED",
            Self::Collected => "COLLECTED",
            Self::Void => "VOID",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ISSUED" => Some(Self::Issued),
            "PARTIALLY_COLLECTED" => Some(Self::PartiallyCollected),
            "COLLECTED" => Some(Self::Collected),
            "VOID" => Some(Self::Void),
            _ => None,
        }
    }

    /// True when the invoice still carries debt.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Issued | Self::PartiallyCollected)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invoice that may still carry debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenInvoice {
    /// Invoice id.
    pub id: InvoiceId,
    /// Human-readable number.
    pub number: String,
    /// Due date.
    pub due_date: NaiveDate,
    /// Amount still to collect.
    pub remaining_balance: Decimal,
    /// Collection status.
    pub status: InvoiceStatus,
}

/// Credit configuration of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCreditInfo {
    /// The client.
    pub client_id: ClientId,
    /// Credit limit; `None` or zero means unlimited.
    pub credit_limit: Option<Decimal>,
    /// Hard block set by an administrator.
    pub is_blocked: bool,
}

/// A client with the invoices that determine its exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCreditProfile {
    /// The client.
    pub client: ClientCreditInfo,
    /// Outstanding invoices.
    pub open_invoices: Vec<OpenInvoice>,
}

impl ClientCreditProfile {
    /// Configured limit, zero when unlimited.
    #[must_use]
    pub fn limit(&self) -> Decimal {
        self.client.credit_limit.unwrap_or(Decimal::ZERO)
    }

    /// Sum of unpaid balances of open invoices.
    #[must_use]
    pub fn current_debt(&self) -> Decimal {
        self.open_invoices
            .iter()
            .filter(|invoice| invoice.status.is_open())
            .map(|invoice| invoice.remaining_balance)
            .sum()
    }

    /// `limit - current_debt`.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.limit() - self.current_debt()
    }

    /// `current_debt / limit * 100`, zero when unlimited.
    #[must_use]
    pub fn utilization(&self) -> Decimal {
        let limit = self.limit();
        if limit > Decimal::ZERO {
            self.current_debt() / limit * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    }
}

/// Evaluation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditConfig {
    /// Days past due before an invoice counts as overdue.
    pub grace_days: u32,
    /// Utilization percentage that raises a warning.
    pub alert_threshold_percent: Decimal,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            grace_days: 0,
            alert_threshold_percent: Decimal::from(80),
        }
    }
}

impl From<&CreditSettings> for CreditConfig {
    fn from(settings: &CreditSettings) -> Self {
        Self {
            grace_days: settings.grace_days,
            alert_threshold_percent: settings.alert_threshold_percent,
        }
    }
}

/// One finding of the evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum CreditIssue {
    /// The client is hard-blocked.
    ClientBlocked,
    /// The order would push debt over the limit.
    LimitExceeded {
        /// Configured limit.
        limit: Decimal,
        /// Debt before the order.
        current_debt: Decimal,
        /// Debt after the order.
        projected: Decimal,
        /// `limit - current_debt`.
        available: Decimal,
    },
    /// The client has overdue invoices.
    OverdueInvoices {
        /// Sum of overdue balances.
        total: Decimal,
        /// Overdue invoices.
        invoice_ids: Vec<InvoiceId>,
        /// Age in days of the oldest overdue invoice.
        oldest_days: i64,
    },
    /// Utilization is at or above the alert threshold.
    HighUtilization {
        /// Current utilization percentage.
        utilization: Decimal,
        /// Configured threshold.
        threshold: Decimal,
    },
}

/// Outcome of a credit evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDecision {
    /// The client.
    pub client_id: ClientId,
    /// Configured limit, zero when unlimited.
    pub limit: Decimal,
    /// Debt before the order.
    pub current_debt: Decimal,
    /// Amount under evaluation.
    pub proposed_amount: Decimal,
    /// `current_debt + proposed_amount`.
    pub projected: Decimal,
    /// `limit - current_debt`.
    pub available: Decimal,
    /// Current utilization percentage, two decimals.
    pub utilization: Decimal,
    /// Sum of overdue balances.
    pub overdue_total: Decimal,
    /// Age in days of the oldest overdue invoice.
    pub oldest_overdue_days: Option<i64>,
    /// Blocking findings.
    pub errors: Vec<CreditIssue>,
    /// Non-blocking findings.
    pub warnings: Vec<CreditIssue>,
    /// No blocking findings.
    pub can_proceed: bool,
    /// Blocked, but a supervisor may override.
    pub requires_override: bool,
}

impl CreditDecision {
    /// Ids of the overdue invoices, if any.
    #[must_use]
    pub fn overdue_invoice_ids(&self) -> &[InvoiceId] {
        self.errors
            .iter()
            .find_map(|issue| match issue {
                CreditIssue::OverdueInvoices { invoice_ids, .. } => Some(invoice_ids.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// True when the client is hard-blocked.
    #[must_use]
    pub fn is_hard_blocked(&self) -> bool {
        self.errors.contains(&CreditIssue::ClientBlocked)
    }
}
