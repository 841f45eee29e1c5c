//! Document lifecycle types.
//!
//! Each document type is a closed set of states with a fixed allow-list of
//! targets. Terminal states have an empty allow-list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of financial document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Negotiable instrument.
    Cheque,
    /// Sale order.
    SaleOrder,
    /// Client invoice.
    Invoice,
    /// Ledger movement (manual entries and reversals).
    Movement,
}

impl DocumentType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheque => "cheque",
            Self::SaleOrder => "sale_order",
            Self::Invoice => "invoice",
            Self::Movement => "movement",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cheque" => Some(Self::Cheque),
            "sale_order" => Some(Self::SaleOrder),
            "invoice" => Some(Self::Invoice),
            "movement" => Some(Self::Movement),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state of some document lifecycle.
pub trait DocumentState: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Document type this state belongs to.
    const DOCUMENT_TYPE: DocumentType;

    /// Every state of the lifecycle.
    fn all() -> &'static [Self];

    /// States reachable from `self` in one transition.
    fn allowed_targets(self) -> &'static [Self];

    /// Stable string form stored in the database.
    fn as_str(self) -> &'static str;

    /// Parses the stable string form.
    fn parse(s: &str) -> Option<Self>;

    /// True when no transition leaves this state.
    fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// True when `to` is in the allow-list of `self`.
    fn can_transition_to(self, to: Self) -> bool {
        self.allowed_targets().contains(&to)
    }
}

/// Negotiable instrument status.
///
/// Valid transitions:
/// - Cartera → Deposited, Endorsed, Voided
/// - Deposited → Cleared, Bounced
/// - Bounced → Cartera (renegotiation)
/// - Cleared, Endorsed, Voided are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChequeStatus {
    /// Held in portfolio.
    Cartera,
    /// Deposited into a bank account.
    Deposited,
    /// Funds confirmed by the bank.
    Cleared,
    /// Rejected by the bank.
    Bounced,
    /// Passed on to a third party.
    Endorsed,
    /// Cancelled.
    Voided,
}

impl DocumentState for ChequeStatus {
    const DOCUMENT_TYPE: DocumentType = DocumentType::Cheque;

    fn all() -> &'static [Self] {
        &[
            Self::Cartera,
            Self::Deposited,
            Self::Cleared,
            Self::Bounced,
            Self::Endorsed,
            Self::Voided,
        ]
    }

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Cartera => &[Self::Deposited, Self::Endorsed, Self::Voided],
            Self::Deposited => &[Self::Cleared, Self::Bounced],
            Self::Bounced => &[Self::Cartera],
            Self::Cleared | Self::Endorsed | Self::Voided => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Cartera => "CARTERA",
            Self::Deposited => "DEPOSITED",
            Self::Cleared => "CLEARED",
            Self::Bounced => "BOUNCED",
            Self::Endorsed => "ENDORSED",
            Self::Voided => "VOIDED",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|state| state.as_str() == s)
    }
}

impl fmt::Display for ChequeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(DocumentState::as_str(*self))
    }
}

/// Sale order status. Only confirmation is handled by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleOrderStatus {
    /// Being edited.
    Draft,
    /// Confirmed; stock and money have moved.
    Confirmed,
}

impl DocumentState for SaleOrderStatus {
    const DOCUMENT_TYPE: DocumentType = DocumentType::SaleOrder;

    fn all() -> &'static [Self] {
        &[Self::Draft, Self::Confirmed]
    }

    fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Confirmed],
            Self::Confirmed => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Confirmed => "CONFIRMED",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|state| state.as_str() == s)
    }
}

impl fmt::Display for SaleOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(DocumentState::as_str(*self))
    }
}
