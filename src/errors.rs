//! Unified error types and result handling.

use thiserror::Error;

/// Every failure the service can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration (config file, env vars, owner ids).
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// Failure reported by the database layer.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Amount was zero, negative, or not a finite number.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Category id is not part of the configured category list.
    #[error("Unknown category: {category}")]
    UnknownCategory {
        /// The rejected category id
        category: String,
    },

    /// Budget period fields do not agree (e.g. monthly budget without a month).
    #[error("Invalid budget period: {message}")]
    InvalidPeriod {
        /// What was wrong
        message: String,
    },

    /// An enabled budget already covers the same category and period.
    #[error("A budget for '{category}' already exists for {scope}")]
    DuplicateBudget {
        /// Category id
        category: String,
        /// Human readable scope, e.g. `2024-03` or `2024`
        scope: String,
    },

    /// No recurring item with that id.
    #[error("Recurring item not found: {id}")]
    RecurringItemNotFound {
        /// Requested id
        id: i64,
    },

    /// No budget with that id.
    #[error("Budget not found: {id}")]
    BudgetNotFound {
        /// Requested id
        id: i64,
    },

    /// No transaction with that id.
    #[error("Transaction not found: {id}")]
    TransactionNotFound {
        /// Requested id
        id: i64,
    },

    /// A collaborator call did not finish within the configured timeout.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Name of the call that timed out
        operation: &'static str,
        /// Configured limit
        timeout_ms: u64,
    },

    /// A notification sink could not deliver a message.
    #[error("Notification delivery failed: {message}")]
    Notification {
        /// Underlying reason
        message: String,
    },

    /// I/O failure (reading config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework failure.
    #[error("Discord framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
