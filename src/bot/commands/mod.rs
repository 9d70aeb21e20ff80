//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Budget management commands
pub mod budget;

/// General utility commands
pub mod general;

/// Recurring item management commands
pub mod recurring;

/// Check cycle commands
pub mod schedule;

/// Expense and income commands
pub mod transaction;

// Export commands
pub use budget::*;
pub use general::*;
pub use recurring::*;
pub use schedule::*;
pub use transaction::*;

use crate::errors::Error;
use chrono::{DateTime, NaiveDate, Utc};

/// Parses a `YYYY-MM-DD` date as midnight UTC.
#[must_use]
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

/// Whether an error was caused by the user's input and should be shown as a
/// plain reply rather than reported as a command failure.
#[must_use]
pub const fn is_user_error(error: &Error) -> bool {
    matches!(
        error,
        Error::Config { .. }
            | Error::InvalidAmount { .. }
            | Error::UnknownCategory { .. }
            | Error::InvalidPeriod { .. }
            | Error::DuplicateBudget { .. }
            | Error::RecurringItemNotFound { .. }
            | Error::BudgetNotFound { .. }
            | Error::TransactionNotFound { .. }
    )
}
