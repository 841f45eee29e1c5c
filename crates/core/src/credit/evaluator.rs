//! Credit risk evaluator.
//!
//! Rules:
//! 1. `limit = client.credit_limit ?? 0`, zero meaning unlimited
//! 2. `projected = current_debt + proposed`
//! 3. limited and `projected > limit` → blocking
//! 4. utilization at or above the threshold → warning
//! 5. any invoice due strictly before `today - grace_days`, with a balance
//!    and still open → blocking, whatever the limit outcome
//! 6. a hard-blocked client → blocking, never overridable

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use super::types::{ClientCreditProfile, CreditConfig, CreditDecision, CreditIssue, OpenInvoice};

/// Stateless credit evaluation.
pub struct CreditEvaluator;

impl CreditEvaluator {
    /// Evaluates a proposed order of `proposed_amount` for the client.
    #[must_use]
    pub fn evaluate(
        profile: &ClientCreditProfile,
        proposed_amount: Decimal,
        today: NaiveDate,
        config: &CreditConfig,
    ) -> CreditDecision {
        let limit = profile.limit();
        let current_debt = profile.current_debt();
        let projected = current_debt + proposed_amount;
        let available = limit - current_debt;
        let utilization = profile.utilization();

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if profile.client.is_blocked {
            errors.push(CreditIssue::ClientBlocked);
        }

        if limit > Decimal::ZERO && projected > limit {
            errors.push(CreditIssue::LimitExceeded {
                limit,
                current_debt,
                projected,
                available,
            });
        }

        if limit > Decimal::ZERO && utilization >= config.alert_threshold_percent {
            warnings.push(CreditIssue::HighUtilization {
                utilization: utilization.round_dp(2),
                threshold: config.alert_threshold_percent,
            });
        }

        let grace_date = today
            .checked_sub_days(Days::new(u64::from(config.grace_days)))
            .unwrap_or(NaiveDate::MIN);
        let overdue: Vec<&OpenInvoice> = profile
            .open_invoices
            .iter()
            .filter(|invoice| Self::is_overdue(invoice, grace_date))
            .collect();

        let overdue_total: Decimal = overdue.iter().map(|invoice| invoice.remaining_balance).sum();
        let oldest_overdue_days = overdue
            .iter()
            .map(|invoice| (today - invoice.due_date).num_days())
            .max();

        if let Some(oldest_days) = oldest_overdue_days {
            errors.push(CreditIssue::OverdueInvoices {
                total: overdue_total,
                invoice_ids: overdue.iter().map(|invoice| invoice.id).collect(),
                oldest_days,
            });
        }

        let can_proceed = errors.is_empty();
        CreditDecision {
            client_id: profile.client.client_id,
            limit,
            current_debt,
            proposed_amount,
            projected,
            available,
            utilization: utilization.round_dp(2),
            overdue_total,
            oldest_overdue_days,
            requires_override: !can_proceed && !profile.client.is_blocked,
            can_proceed,
            errors,
            warnings,
        }
    }

    /// Overdue means due strictly before `grace_date`, unpaid and still open.
    #[must_use]
    pub fn is_overdue(invoice: &OpenInvoice, grace_date: NaiveDate) -> bool {
        invoice.due_date < grace_date
            && invoice.remaining_balance > Decimal::ZERO
            && invoice.status.is_open()
    }
}
