//! Collaborator interfaces used by the scanner and the budget notifier.
//!
//! The scheduling logic never talks to the database or to Discord directly. It is
//! handed implementations of these traits, which keeps the decision code testable
//! with in-memory fakes. [`SeaOrmStore`] is the production implementation of the
//! four stores.

use crate::{
    entities::{
        BudgetModel, NotificationTrackingModel, RecurringItemModel, TransactionModel,
        TransactionType,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Runs one collaborator call, failing with [`Error::Timeout`] after `limit`.
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, future).await.unwrap_or_else(|_| {
        Err(Error::Timeout {
            operation,
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        })
    })
}

/// Data needed to create a transaction; the store assigns id and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Owner
    pub user_id: String,
    /// Expense or income
    pub transaction_type: TransactionType,
    /// Category id
    pub category: String,
    /// Positive amount
    pub amount: f64,
    /// Description shown to the user
    pub description: String,
    /// When the money moved
    pub date: DateTime<Utc>,
    /// Recurring item that produced it
    pub recurring_id: Option<i64>,
    /// Scheduled date of the recurring period it pays for
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Selects transactions for one owner, category and date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Owner
    pub user_id: String,
    /// Category id, or every category when `None`
    pub category: Option<String>,
    /// Only this direction, or both when `None`
    pub transaction_type: Option<TransactionType>,
    /// Inclusive lower bound
    pub from: DateTime<Utc>,
    /// Exclusive upper bound
    pub until: DateTime<Utc>,
}

/// Scheduling fields written after a recurring item was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingUpdate {
    /// Next scheduled occurrence
    pub next_date: DateTime<Utc>,
    /// Time the item was processed
    pub last_processed_date: DateTime<Utc>,
}

/// How urgent a user notification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational (confirmations)
    Info,
    /// Something to look at soon (reminders, 80% budget alert)
    Warning,
    /// Limit close or exceeded (90% and 100% budget alerts)
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        })
    }
}

/// Persistence for transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persists a new transaction and returns the stored record.
    async fn create_transaction(&self, new: NewTransaction) -> Result<TransactionModel>;

    /// Lists transactions matching `filter`.
    async fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<TransactionModel>>;

    /// Finds the transaction already booked for a recurring item's scheduled date.
    async fn find_scheduled_charge(
        &self,
        recurring_id: i64,
        scheduled_for: DateTime<Utc>,
    ) -> Result<Option<TransactionModel>>;
}

/// Persistence for recurring items.
#[async_trait]
pub trait RecurringItemStore: Send + Sync {
    /// Lists every item with status `active`.
    async fn list_active(&self) -> Result<Vec<RecurringItemModel>>;

    /// Loads the current state of one item.
    async fn get_item(&self, id: i64) -> Result<Option<RecurringItemModel>>;

    /// Writes the new schedule of a processed item.
    async fn update_scheduling(&self, id: i64, update: SchedulingUpdate) -> Result<()>;

    /// Records that a reminder was sent for the item's occurrence at `next_date`.
    async fn mark_reminded(&self, id: i64, next_date: DateTime<Utc>) -> Result<()>;
}

/// Persistence for budgets.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Lists enabled budgets of one owner.
    async fn list_enabled(&self, user_id: &str) -> Result<Vec<BudgetModel>>;
}

/// Persistence for per-budget alert bookkeeping.
#[async_trait]
pub trait NotificationTrackingStore: Send + Sync {
    /// Returns the record for a budget, or an empty one if none exists yet.
    async fn get_record(&self, budget_id: i64) -> Result<NotificationTrackingModel>;

    /// Marks every threshold up to and including `threshold` as sent.
    async fn mark_sent(&self, budget_id: i64, threshold: u32, percentage: f64) -> Result<()>;

    /// Clears every flag when `percentage` is below the lowest threshold.
    async fn reset_if_below(&self, budget_id: i64, percentage: f64) -> Result<()>;
}

/// Destination for user-facing messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one message.
    async fn notify(&self, severity: Severity, title: &str, message: &str) -> Result<()>;
}

/// `SeaORM` backed implementation of every store.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Wraps a database connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl TransactionStore for SeaOrmStore {
    async fn create_transaction(&self, new: NewTransaction) -> Result<TransactionModel> {
        super::transaction::create_transaction(&self.db, new).await
    }

    async fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<TransactionModel>> {
        super::transaction::list_transactions(&self.db, filter).await
    }

    async fn find_scheduled_charge(
        &self,
        recurring_id: i64,
        scheduled_for: DateTime<Utc>,
    ) -> Result<Option<TransactionModel>> {
        super::transaction::find_scheduled_charge(&self.db, recurring_id, scheduled_for).await
    }
}

#[async_trait]
impl RecurringItemStore for SeaOrmStore {
    async fn list_active(&self) -> Result<Vec<RecurringItemModel>> {
        super::recurring::get_active_items(&self.db).await
    }

    async fn get_item(&self, id: i64) -> Result<Option<RecurringItemModel>> {
        super::recurring::get_item_by_id(&self.db, id).await
    }

    async fn update_scheduling(&self, id: i64, update: SchedulingUpdate) -> Result<()> {
        super::recurring::update_scheduling(&self.db, id, update).await
    }

    async fn mark_reminded(&self, id: i64, next_date: DateTime<Utc>) -> Result<()> {
        super::recurring::mark_reminded(&self.db, id, next_date).await
    }
}

#[async_trait]
impl BudgetStore for SeaOrmStore {
    async fn list_enabled(&self, user_id: &str) -> Result<Vec<BudgetModel>> {
        super::budget::get_enabled_budgets(&self.db, user_id).await
    }
}

#[async_trait]
impl NotificationTrackingStore for SeaOrmStore {
    async fn get_record(&self, budget_id: i64) -> Result<NotificationTrackingModel> {
        super::tracking::get_record(&self.db, budget_id).await
    }

    async fn mark_sent(&self, budget_id: i64, threshold: u32, percentage: f64) -> Result<()> {
        super::tracking::mark_sent(&self.db, budget_id, threshold, percentage).await
    }

    async fn reset_if_below(&self, budget_id: i64, percentage: f64) -> Result<()> {
        super::tracking::reset_if_below(&self.db, budget_id, percentage).await
    }
}
