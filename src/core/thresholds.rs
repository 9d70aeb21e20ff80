//! Budget threshold decisions.
//!
//! Pure functions only: given a budget, the spending in its scope and the
//! tracking record, decide which alert (if any) to send and how the tracking
//! record changes. The notifier applies the result.
//!
//! When one transaction jumps past several unsent thresholds at once, only the
//! highest one produces an alert and the lower ones are marked silently.

use super::stores::Severity;
use crate::entities::{
    BudgetModel, BudgetPeriod, NotificationTrackingModel, TransactionModel, TransactionType,
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;

/// Alert thresholds in percent, lowest first.
pub const THRESHOLDS: [u32; 3] = [80, 90, 100];

/// Lowest threshold; spending under it re-arms every alert.
pub const REARM_BELOW: f64 = 80.0;

/// A budget alert ready to be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetAlert {
    /// Budget that crossed a threshold
    pub budget_id: i64,
    /// Threshold that fired (80, 90 or 100)
    pub threshold: u32,
    /// Warning at 80, critical at 90 and 100
    pub severity: Severity,
    /// Display name of the budget's category
    pub category_name: String,
    /// Budget limit
    pub budget_amount: f64,
    /// Spending in the budget's period
    pub spent: f64,
    /// `spent * 100 / budget_amount`
    pub percentage: f64,
    /// `budget_amount - spent`, negative once exceeded
    pub remaining: f64,
}

impl BudgetAlert {
    /// Short notification title.
    #[must_use]
    pub fn title(&self) -> String {
        if self.threshold >= 100 {
            format!("Budget exceeded: {} (100%)", self.category_name)
        } else {
            format!("Budget alert: {} ({}%)", self.category_name, self.threshold)
        }
    }

    /// Notification body.
    #[must_use]
    pub fn message(&self) -> String {
        let remaining = if self.remaining < 0.0 {
            format!("over by ${:.2}", -self.remaining)
        } else {
            format!("${:.2} remaining", self.remaining)
        };
        format!(
            "You have spent ${:.2} of your ${:.2} {} budget ({:.1}%), {}.",
            self.spent, self.budget_amount, self.category_name, self.percentage, remaining
        )
    }
}

/// Change to apply to a budget's tracking record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackingUpdate {
    /// Leave the record as it is
    Unchanged,
    /// Mark every threshold up to and including `up_to` as sent
    MarkSent {
        /// Highest threshold reached
        up_to: u32,
        /// Percentage observed
        percentage: f64,
    },
    /// Clear every flag
    Reset {
        /// Percentage observed, below the re-arm level
        percentage: f64,
    },
}

/// Outcome of evaluating one budget.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdDecision {
    /// Alert to send, if a new threshold was crossed
    pub alert: Option<BudgetAlert>,
    /// How the tracking record changes
    pub update: TrackingUpdate,
}

impl ThresholdDecision {
    const fn nothing() -> Self {
        Self {
            alert: None,
            update: TrackingUpdate::Unchanged,
        }
    }
}

/// Severity for a threshold.
#[must_use]
pub const fn severity_for(threshold: u32) -> Severity {
    if threshold >= 90 {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

/// `spent` as a percentage of `budget_amount`, or `None` for unusable budgets.
#[must_use]
pub fn spending_percentage(budget_amount: f64, spent: f64) -> Option<f64> {
    if !budget_amount.is_finite() || budget_amount <= 0.0 || !spent.is_finite() {
        return None;
    }
    Some(spent * 100.0 / budget_amount)
}

/// Half-open `[start, end)` window of the budget's period.
///
/// Returns `None` for a monthly budget without a valid month.
#[must_use]
pub fn budget_window(budget: &BudgetModel) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = match budget.period {
        BudgetPeriod::Monthly => {
            let month = budget.month?;
            let start = NaiveDate::from_ymd_opt(budget.year, month, 1)?;
            let end = if month == 12 {
                NaiveDate::from_ymd_opt(budget.year + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(budget.year, month + 1, 1)?
            };
            (start, end)
        }
        BudgetPeriod::Yearly => (
            NaiveDate::from_ymd_opt(budget.year, 1, 1)?,
            NaiveDate::from_ymd_opt(budget.year + 1, 1, 1)?,
        ),
    };
    Some((
        Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0)?),
        Utc.from_utc_datetime(&end.and_hms_opt(0, 0, 0)?),
    ))
}

/// Whether the budget's period contains `date`.
#[must_use]
pub fn period_contains(budget: &BudgetModel, date: DateTime<Utc>) -> bool {
    match budget.period {
        BudgetPeriod::Monthly => {
            date.year() == budget.year && Some(date.month()) == budget.month
        }
        BudgetPeriod::Yearly => date.year() == budget.year,
    }
}

/// Whether an enabled budget applies to this transaction.
#[must_use]
pub fn budget_covers(budget: &BudgetModel, transaction: &TransactionModel) -> bool {
    budget.enabled
        && budget.user_id == transaction.user_id
        && budget.category_id == transaction.category
        && period_contains(budget, transaction.date)
}

/// Sum of expenses in the budget's category, owner and period.
#[must_use]
pub fn spent_in_scope(budget: &BudgetModel, transactions: &[TransactionModel]) -> f64 {
    transactions
        .iter()
        .filter(|t| {
            t.transaction_type == TransactionType::Expense
                && t.user_id == budget.user_id
                && t.category == budget.category_id
                && period_contains(budget, t.date)
        })
        .map(|t| t.amount)
        .sum()
}

/// Decides the alert and tracking change for one budget at a given spending level.
#[must_use]
pub fn decide(
    budget: &BudgetModel,
    category_name: &str,
    spent: f64,
    record: &NotificationTrackingModel,
) -> ThresholdDecision {
    let Some(percentage) = spending_percentage(budget.amount, spent) else {
        return ThresholdDecision::nothing();
    };

    if percentage < REARM_BELOW {
        return ThresholdDecision {
            alert: None,
            update: if record.any_sent() {
                TrackingUpdate::Reset { percentage }
            } else {
                TrackingUpdate::Unchanged
            },
        };
    }

    // Highest threshold reached that has not alerted yet
    let Some(threshold) = THRESHOLDS
        .iter()
        .rev()
        .copied()
        .find(|&t| percentage >= f64::from(t) && !record.is_sent(t))
    else {
        return ThresholdDecision::nothing();
    };

    ThresholdDecision {
        alert: Some(BudgetAlert {
            budget_id: budget.id,
            threshold,
            severity: severity_for(threshold),
            category_name: category_name.to_string(),
            budget_amount: budget.amount,
            spent,
            percentage,
            remaining: budget.amount - spent,
        }),
        update: TrackingUpdate::MarkSent {
            up_to: threshold,
            percentage,
        },
    }
}

/// Evaluates every budget that covers `transaction`.
///
/// `all_transactions` must include `transaction` itself; `records` holds the
/// tracking record of each budget (missing entries count as empty). Returns one
/// decision per covering budget, in the order the budgets were given.
#[must_use]
pub fn evaluate(
    transaction: &TransactionModel,
    budgets: &[BudgetModel],
    all_transactions: &[TransactionModel],
    records: &HashMap<i64, NotificationTrackingModel>,
    category_name: &str,
) -> Vec<(i64, ThresholdDecision)> {
    if transaction.transaction_type != TransactionType::Expense {
        return Vec::new();
    }

    budgets
        .iter()
        .filter(|b| budget_covers(b, transaction))
        .map(|budget| {
            let spent = spent_in_scope(budget, all_transactions);
            let decision = match records.get(&budget.id) {
                Some(record) => decide(budget, category_name, spent, record),
                None => decide(
                    budget,
                    category_name,
                    spent,
                    &NotificationTrackingModel::empty(budget.id),
                ),
            };
            (budget.id, decision)
        })
        .collect()
}

/// Applies a tracking update to an in-memory record.
///
/// Mirrors what the tracking store does so decisions can be replayed in tests
/// and by callers that keep state in memory.
pub fn apply_update(record: &mut NotificationTrackingModel, update: TrackingUpdate) {
    match update {
        TrackingUpdate::Unchanged => {}
        TrackingUpdate::Reset { .. } => {
            let budget_id = record.budget_id;
            *record = NotificationTrackingModel::empty(budget_id);
        }
        TrackingUpdate::MarkSent { up_to, percentage } => {
            if up_to >= 80 && !record.sent_80 {
                record.sent_80 = true;
                record.percentage_80 = Some(percentage);
            }
            if up_to >= 90 && !record.sent_90 {
                record.sent_90 = true;
                record.percentage_90 = Some(percentage);
            }
            if up_to >= 100 && !record.sent_100 {
                record.sent_100 = true;
                record.percentage_100 = Some(percentage);
            }
            record.updated_at = Utc::now();
        }
    }
}
