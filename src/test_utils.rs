//! Shared test utilities for `BudgetBuddy`.
//!
//! Helpers for setting up test databases, building entities with sensible
//! defaults and wiring the scheduling services to recording fakes.

#![allow(clippy::unwrap_used)]

use crate::{
    config::{AppConfig, SchedulerSettings},
    core::{
        budget::{self, NewBudget},
        notifications::Notifications,
        notifier::BudgetNotifier,
        scanner::DueItemScanner,
        stores::{
            NewTransaction, NotificationSink, NotificationTrackingStore, RecurringItemStore,
            SchedulingUpdate, SeaOrmStore, Severity,
        },
        transaction::TransactionService,
    },
    entities::{
        BudgetModel, BudgetPeriod, ItemStatus, NotificationTrackingModel, RecurringItemModel,
        TransactionModel, TransactionType, recurring_item,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Noon UTC on the given day.
pub fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// A one-off expense ready to be stored.
pub fn new_expense(
    user_id: &str,
    category: &str,
    amount: f64,
    date: DateTime<Utc>,
) -> NewTransaction {
    NewTransaction {
        user_id: user_id.to_string(),
        transaction_type: TransactionType::Expense,
        category: category.to_string(),
        amount,
        description: "Test expense".to_string(),
        date,
        recurring_id: None,
        scheduled_for: None,
    }
}

/// An in-memory expense row, for the pure threshold functions.
pub fn expense_model(
    user_id: &str,
    category: &str,
    amount: f64,
    date: DateTime<Utc>,
) -> TransactionModel {
    TransactionModel {
        id: 0,
        user_id: user_id.to_string(),
        transaction_type: TransactionType::Expense,
        category: category.to_string(),
        amount,
        description: "Test expense".to_string(),
        date,
        recurring_id: None,
        scheduled_for: None,
        created_at: date,
    }
}

/// An in-memory enabled budget owned by `user1`.
pub fn budget_model(
    id: i64,
    category: &str,
    amount: f64,
    period: BudgetPeriod,
    year: i32,
    month: Option<u32>,
) -> BudgetModel {
    BudgetModel {
        id,
        user_id: "user1".to_string(),
        category_id: category.to_string(),
        amount,
        period,
        year,
        month,
        alert_threshold: budget::DEFAULT_ALERT_THRESHOLD,
        enabled: true,
        created_at: ts(2024, 1, 1),
        updated_at: ts(2024, 1, 1),
    }
}

/// An in-memory active monthly-priced item owned by `user1`.
///
/// # Defaults
/// * `name`: `"Item <id>"`
/// * `category`: `"subscriptions"`
/// * `amount`: 15.99
pub fn item_model(id: i64, frequency: &str, next_date: DateTime<Utc>) -> RecurringItemModel {
    RecurringItemModel {
        id,
        user_id: "user1".to_string(),
        name: format!("Item {id}"),
        category: "subscriptions".to_string(),
        amount: 15.99,
        frequency: frequency.to_string(),
        next_date,
        status: ItemStatus::Active,
        last_processed_date: None,
        last_reminded_for: None,
        created_at: ts(2024, 1, 1),
        updated_at: ts(2024, 1, 1),
    }
}

/// Stores a budget; monthly when `month` is given, yearly otherwise.
pub async fn create_test_budget(
    db: &DatabaseConnection,
    user_id: &str,
    category: &str,
    amount: f64,
    year: i32,
    month: Option<u32>,
) -> Result<BudgetModel> {
    let period = if month.is_some() {
        BudgetPeriod::Monthly
    } else {
        BudgetPeriod::Yearly
    };
    budget::create_budget(
        db,
        &AppConfig::default(),
        NewBudget {
            user_id: user_id.to_string(),
            category_id: category.to_string(),
            amount,
            period,
            year,
            month,
        },
    )
    .await
}

/// Stores an active item owned by `user1` in the `subscriptions` category.
///
/// Inserted directly so that tests can use frequencies the service would reject.
pub async fn create_test_item(
    db: &DatabaseConnection,
    name: &str,
    frequency: &str,
    next_date: DateTime<Utc>,
) -> Result<RecurringItemModel> {
    insert_item(db, "user1", name, 15.99, frequency, next_date).await
}

/// Same as [`create_test_item`] with a custom owner.
pub async fn create_test_item_for(
    db: &DatabaseConnection,
    user_id: &str,
    name: &str,
    frequency: &str,
    next_date: DateTime<Utc>,
) -> Result<RecurringItemModel> {
    insert_item(db, user_id, name, 15.99, frequency, next_date).await
}

/// Same as [`create_test_item`] with a custom monthly price.
pub async fn create_test_item_priced(
    db: &DatabaseConnection,
    name: &str,
    amount: f64,
    next_date: DateTime<Utc>,
) -> Result<RecurringItemModel> {
    insert_item(db, "user1", name, amount, "monthly", next_date).await
}

async fn insert_item(
    db: &DatabaseConnection,
    user_id: &str,
    name: &str,
    amount: f64,
    frequency: &str,
    next_date: DateTime<Utc>,
) -> Result<RecurringItemModel> {
    let created = ts(2024, 1, 1);
    let item = recurring_item::ActiveModel {
        user_id: Set(user_id.to_string()),
        name: Set(name.to_string()),
        category: Set("subscriptions".to_string()),
        amount: Set(amount),
        frequency: Set(frequency.to_string()),
        next_date: Set(next_date),
        status: Set(ItemStatus::Active),
        last_processed_date: Set(None),
        last_reminded_for: Set(None),
        created_at: Set(created),
        updated_at: Set(created),
        ..Default::default()
    };
    Ok(item.insert(db).await?)
}

/// A message captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Severity it was sent with
    pub severity: Severity,
    /// Title line
    pub title: String,
    /// Body
    pub message: String,
}

/// Sink that keeps every message in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl RecordingSink {
    /// Messages received so far, oldest first.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, severity: Severity, title: &str, message: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            severity,
            title: title.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// Sink that rejects every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, _severity: Severity, _title: &str, _message: &str) -> Result<()> {
        Err(Error::Notification {
            message: "sink unavailable".to_string(),
        })
    }
}

/// Sink that never answers within any reasonable timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StallingSink;

#[async_trait]
impl NotificationSink for StallingSink {
    async fn notify(&self, _severity: Severity, _title: &str, _message: &str) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

/// Tracking store whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTrackingStore;

#[async_trait]
impl NotificationTrackingStore for FailingTrackingStore {
    async fn get_record(&self, _budget_id: i64) -> Result<NotificationTrackingModel> {
        Err(Error::Database(sea_orm::DbErr::Custom("tracking offline".to_string())))
    }

    async fn mark_sent(&self, _budget_id: i64, _threshold: u32, _percentage: f64) -> Result<()> {
        Err(Error::Database(sea_orm::DbErr::Custom("tracking offline".to_string())))
    }

    async fn reset_if_below(&self, _budget_id: i64, _percentage: f64) -> Result<()> {
        Err(Error::Database(sea_orm::DbErr::Custom("tracking offline".to_string())))
    }
}

/// Recurring item store that can fail or stall schedule updates for one item.
pub struct FlakyRecurringStore {
    inner: Arc<SeaOrmStore>,
    failing: AtomicI64,
    stalled: AtomicI64,
}

impl FlakyRecurringStore {
    /// Wraps a working store; nothing fails until configured.
    pub const fn new(inner: Arc<SeaOrmStore>) -> Self {
        Self {
            inner,
            failing: AtomicI64::new(0),
            stalled: AtomicI64::new(0),
        }
    }

    /// Makes `update_scheduling` fail for `id`.
    pub fn fail_updates_for(&self, id: i64) {
        self.failing.store(id, Ordering::SeqCst);
    }

    /// Makes `update_scheduling` hang for `id`.
    pub fn stall_updates_for(&self, id: i64) {
        self.stalled.store(id, Ordering::SeqCst);
    }

    /// Clears every configured failure.
    pub fn heal(&self) {
        self.failing.store(0, Ordering::SeqCst);
        self.stalled.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecurringItemStore for FlakyRecurringStore {
    async fn list_active(&self) -> Result<Vec<RecurringItemModel>> {
        self.inner.list_active().await
    }

    async fn get_item(&self, id: i64) -> Result<Option<RecurringItemModel>> {
        self.inner.get_item(id).await
    }

    async fn update_scheduling(&self, id: i64, update: SchedulingUpdate) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) == id {
            return Err(Error::Database(sea_orm::DbErr::Custom("write rejected".to_string())));
        }
        if self.stalled.load(Ordering::SeqCst) == id {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        self.inner.update_scheduling(id, update).await
    }

    async fn mark_reminded(&self, id: i64, next_date: DateTime<Utc>) -> Result<()> {
        self.inner.mark_reminded(id, next_date).await
    }
}

/// Recurring item store that lists a fixed set of items, as loaded when a scan
/// started, while every other call sees the live database.
pub struct SnapshotRecurringStore {
    inner: Arc<SeaOrmStore>,
    listed: Vec<RecurringItemModel>,
}

impl SnapshotRecurringStore {
    /// Lists `listed` regardless of later changes in `inner`.
    pub const fn new(inner: Arc<SeaOrmStore>, listed: Vec<RecurringItemModel>) -> Self {
        Self { inner, listed }
    }
}

#[async_trait]
impl RecurringItemStore for SnapshotRecurringStore {
    async fn list_active(&self) -> Result<Vec<RecurringItemModel>> {
        Ok(self.listed.clone())
    }

    async fn get_item(&self, id: i64) -> Result<Option<RecurringItemModel>> {
        self.inner.get_item(id).await
    }

    async fn update_scheduling(&self, id: i64, update: SchedulingUpdate) -> Result<()> {
        self.inner.update_scheduling(id, update).await
    }

    async fn mark_reminded(&self, id: i64, next_date: DateTime<Utc>) -> Result<()> {
        self.inner.mark_reminded(id, next_date).await
    }
}

/// A fan-out delivering to `sink` only.
pub fn recording_notifications(sink: &RecordingSink) -> Notifications {
    Notifications::new(Duration::from_secs(1)).with_sink(Arc::new(sink.clone()))
}

/// Budget notifier backed by `db`, delivering to `sink`.
pub fn test_notifier(db: &DatabaseConnection, sink: &RecordingSink) -> BudgetNotifier {
    let store = Arc::new(SeaOrmStore::new(db.clone()));
    BudgetNotifier::new(
        Arc::<SeaOrmStore>::clone(&store),
        Arc::<SeaOrmStore>::clone(&store),
        store,
        recording_notifications(sink),
        Arc::new(AppConfig::default()),
    )
}

/// Transaction service backed by `db`, delivering budget alerts to `sink`.
pub fn test_transaction_service(
    db: &DatabaseConnection,
    sink: &RecordingSink,
) -> TransactionService {
    let store = Arc::new(SeaOrmStore::new(db.clone()));
    TransactionService::new(store, test_notifier(db, sink))
}

/// Scanner backed by `db` with the given scheduler settings.
pub fn test_scanner(
    db: &DatabaseConnection,
    sink: &RecordingSink,
    settings: SchedulerSettings,
) -> DueItemScanner {
    let config = AppConfig {
        scheduler: settings,
        ..AppConfig::default()
    };
    DueItemScanner::new(
        Arc::new(SeaOrmStore::new(db.clone())),
        test_transaction_service(db, sink),
        recording_notifications(sink),
        Arc::new(config),
    )
}
