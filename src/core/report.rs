//! Report formatting.
//!
//! Turns budget usage, upcoming charges and scan outcomes into the text shown
//! by the bot and written to the log. Everything here is pure.

use super::{
    budget::{BudgetUsage, scope_label},
    scanner::{ScanOutcome, UpcomingCharge},
};
use crate::{
    config::AppConfig,
    entities::{RecurringItemModel, TransactionModel, TransactionType},
};
use std::fmt::Write;

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `progress_percent` - Progress percentage; the bar is clamped to 0-100, the label is not
/// * `bar_length` - Length of the progress bar in characters (default 10)
#[must_use]
pub fn format_progress_bar(progress_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped_progress = progress_percent.clamp(0.0, 100.0);

    // Cast safety: clamped_progress ∈ [0, 100], length is small (10-20).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped_progress / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!(
        "[{}{}] {progress_percent:.1}%",
        "█".repeat(filled),
        "░".repeat(empty)
    )
}

/// Formats an amount with the sign of its direction, e.g. `-$25.50` for an expense.
#[must_use]
pub fn format_transaction_amount(transaction: &TransactionModel) -> String {
    match transaction.transaction_type {
        TransactionType::Income => format!("+${:.2}", transaction.amount),
        TransactionType::Expense => format!("-${:.2}", transaction.amount),
    }
}

/// One line per transaction: date, signed amount, category and description.
#[must_use]
pub fn format_transaction_summary(transaction: &TransactionModel, config: &AppConfig) -> String {
    format!(
        "{} | {} | {} | {}",
        transaction.date.format("%Y-%m-%d"),
        format_transaction_amount(transaction),
        config.category_name(&transaction.category),
        transaction.description
    )
}

/// Usage block for one budget.
#[must_use]
pub fn format_budget_usage(usage: &BudgetUsage, config: &AppConfig) -> String {
    let budget = &usage.budget;
    let mut line = format!(
        "**#{}** {} ({}){}\n{}\n${:.2} of ${:.2}",
        budget.id,
        config.category_name(&budget.category_id),
        scope_label(budget.period, budget.year, budget.month),
        if budget.enabled { "" } else { " - disabled" },
        format_progress_bar(usage.percentage, None),
        usage.spent,
        budget.amount
    );
    if usage.remaining >= 0.0 {
        let _ = write!(line, ", ${:.2} left", usage.remaining);
    } else {
        let _ = write!(line, ", over by ${:.2}", -usage.remaining);
    }
    line
}

/// One line describing a recurring item.
#[must_use]
pub fn format_recurring_item(item: &RecurringItemModel, config: &AppConfig) -> String {
    format!(
        "**#{}** {} - ${:.2} {} ({}), next on {} [{}]",
        item.id,
        item.name,
        item.amount,
        item.frequency,
        config.category_name(&item.category),
        item.next_date.format("%Y-%m-%d"),
        item.status.as_str()
    )
}

/// "today", "tomorrow" or "in N days".
#[must_use]
pub fn format_days_until(days: i64) -> String {
    match days {
        d if d <= 0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d => format!("in {d} days"),
    }
}

/// List of upcoming charges with a total.
#[must_use]
pub fn format_upcoming_charges(charges: &[UpcomingCharge]) -> String {
    if charges.is_empty() {
        return "No upcoming charges.".to_string();
    }

    let mut out = String::new();
    for charge in charges {
        let _ = writeln!(
            out,
            "• {} - ${:.2} {} ({})",
            charge.item.name,
            charge.item.amount,
            format_days_until(charge.days_until),
            charge.item.next_date.format("%Y-%m-%d")
        );
    }
    let total: f64 = charges.iter().map(|c| c.item.amount).sum();
    let _ = write!(out, "Total: ${total:.2}");
    out
}

/// Summary of a scan, as shown by `/check_due`.
#[must_use]
pub fn format_scan_summary(outcome: &ScanOutcome) -> String {
    let mut summary = format!(
        "Processed {} due item(s), {} upcoming",
        outcome.processed.len(),
        outcome.upcoming.len()
    );
    if !outcome.failed.is_empty() {
        let _ = write!(summary, ", {} failed", outcome.failed.len());
    }
    if !outcome.skipped.is_empty() {
        let _ = write!(summary, ", {} skipped", outcome.skipped.len());
    }
    summary.push('.');

    for processed in &outcome.processed {
        let _ = write!(
            summary,
            "\n✅ {} - ${:.2}, next on {}",
            processed.item.name,
            processed.item.amount,
            processed.item.next_date.format("%Y-%m-%d")
        );
    }
    for failure in &outcome.failed {
        let _ = write!(summary, "\n⚠️ Item #{}: {}", failure.item_id, failure.reason);
    }
    summary
}
