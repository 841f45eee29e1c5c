//! Transition validation.

use serde::{Deserialize, Serialize};
use tesoro_shared::types::{AccountId, ChequeId, UserId};
use uuid::Uuid;

use super::error::TransitionError;
use super::types::{ChequeStatus, DocumentState, DocumentType};
use crate::ledger::AccountKind;

/// An accepted transition, ready to be applied and audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S> {
    /// The document.
    pub document_id: Uuid,
    /// State before.
    pub from: S,
    /// State after.
    pub to: S,
    /// Who requested it.
    pub actor: UserId,
}

impl<S: DocumentState> Transition<S> {
    /// Kind of document transitioned.
    #[must_use]
    pub fn document_type(&self) -> DocumentType {
        S::DOCUMENT_TYPE
    }
}

/// Bank account a cheque is deposited into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositTarget {
    /// The account.
    pub account_id: AccountId,
    /// Its kind; must be BANK.
    pub kind: AccountKind,
}

/// A requested cheque action with the data it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChequeAction {
    /// Deposit into a bank account.
    Deposit {
        /// Target account, resolved by the caller.
        #[serde(skip)]
        target: Option<DepositTarget>,
    },
    /// Bank confirmed the funds.
    Clear,
    /// Bank rejected the cheque.
    Bounce {
        /// Rejection reason given by the bank.
        reason: String,
    },
    /// Pass the cheque on to a third party.
    Endorse {
        /// Who receives it.
        endorsee: String,
    },
    /// Cancel the cheque.
    Void {
        /// Why it was cancelled.
        reason: String,
    },
    /// Return a bounced cheque to the portfolio.
    Renegotiate,
}

impl ChequeAction {
    /// State the action moves the cheque to.
    #[must_use]
    pub fn target(&self) -> ChequeStatus {
        match self {
            Self::Deposit { .. } => ChequeStatus::Deposited,
            Self::Clear => ChequeStatus::Cleared,
            Self::Bounce { .. } => ChequeStatus::Bounced,
            Self::Endorse { .. } => ChequeStatus::Endorsed,
            Self::Void { .. } => ChequeStatus::Voided,
            Self::Renegotiate => ChequeStatus::Cartera,
        }
    }

    fn validate_payload(&self) -> Result<(), TransitionError> {
        let to = self.target().as_str();
        let missing = |field| TransitionError::MissingTransitionData { to, field };

        match self {
            Self::Deposit { target: None } => Err(missing("deposit_account_id")),
            Self::Deposit {
                target: Some(target),
            } if target.kind != AccountKind::Bank => Err(TransitionError::InvalidDepositTarget {
                account_id: target.account_id,
                kind: target.kind,
            }),
            Self::Bounce { reason } if reason.trim().is_empty() => Err(missing("rejection_reason")),
            Self::Endorse { endorsee } if endorsee.trim().is_empty() => Err(missing("endorsee")),
            Self::Void { reason } if reason.trim().is_empty() => Err(missing("void_reason")),
            _ => Ok(()),
        }
    }
}

/// Stateless lifecycle validation.
///
/// Re-requesting the current state is rejected like any other transition
/// outside the allow-list.
pub struct StateMachine;

impl StateMachine {
    /// Validates `from → to` against the allow-list of the document type.
    pub fn validate_transition<S: DocumentState>(
        document_id: Uuid,
        from: S,
        to: S,
        actor: UserId,
    ) -> Result<Transition<S>, TransitionError> {
        if !from.can_transition_to(to) {
            return Err(TransitionError::InvalidTransition {
                document_type: S::DOCUMENT_TYPE,
                document_id,
                from: from.as_str(),
                to: to.as_str(),
            });
        }

        Ok(Transition {
            document_id,
            from,
            to,
            actor,
        })
    }

    /// Validates a cheque action: the transition first, then its data.
    pub fn validate_cheque_action(
        cheque_id: ChequeId,
        from: ChequeStatus,
        action: &ChequeAction,
        actor: UserId,
    ) -> Result<Transition<ChequeStatus>, TransitionError> {
        let transition = Self::validate_transition(cheque_id.into_inner(), from, action.target(), actor)?;
        action.validate_payload()?;
        Ok(transition)
    }
}
