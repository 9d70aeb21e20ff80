//! Recurring item business logic.
//!
//! Creation, editing and status changes for recurring items, plus the two
//! scheduling writes the scanner needs. Paused and cancelled items keep their
//! `next_date`; resuming does not backfill missed periods beyond what the next
//! scan books.

use super::{recurrence::Frequency, stores::SchedulingUpdate};
use crate::{
    config::AppConfig,
    entities::{ItemStatus, RecurringItem, recurring_item},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Input for [`create_recurring_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringItem {
    /// Owner
    pub user_id: String,
    /// Label, e.g. "Netflix"
    pub name: String,
    /// Category id
    pub category: String,
    /// Amount per occurrence
    pub amount: f64,
    /// How often it is charged
    pub frequency: Frequency,
    /// First scheduled occurrence
    pub next_date: DateTime<Utc>,
}

/// Fields that can be edited on an existing item. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurringItemChanges {
    /// New label
    pub name: Option<String>,
    /// New category id
    pub category: Option<String>,
    /// New amount
    pub amount: Option<f64>,
    /// New frequency
    pub frequency: Option<Frequency>,
    /// New next occurrence
    pub next_date: Option<DateTime<Utc>>,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Config {
            message: "Recurring item name cannot be empty".to_string(),
        });
    }
    Ok(())
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Creates an active recurring item.
pub async fn create_recurring_item(
    db: &DatabaseConnection,
    config: &AppConfig,
    new: NewRecurringItem,
) -> Result<recurring_item::Model> {
    if new.user_id.trim().is_empty() {
        return Err(Error::Config {
            message: "Recurring item has no owner".to_string(),
        });
    }
    validate_name(&new.name)?;
    validate_amount(new.amount)?;
    config.ensure_category(&new.category)?;

    let now = Utc::now();
    let model = recurring_item::ActiveModel {
        user_id: Set(new.user_id),
        name: Set(new.name.trim().to_string()),
        category: Set(new.category),
        amount: Set(new.amount),
        frequency: Set(new.frequency.as_str().to_string()),
        next_date: Set(new.next_date),
        status: Set(ItemStatus::Active),
        last_processed_date: Set(None),
        last_reminded_for: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = model.insert(db).await?;
    info!(
        "Created recurring item {} '{}' ({} {:.2}, next {})",
        result.id, result.name, result.frequency, result.amount, result.next_date
    );
    Ok(result)
}

/// Finds a recurring item by id.
pub async fn get_item_by_id(
    db: &DatabaseConnection,
    id: i64,
) -> Result<Option<recurring_item::Model>> {
    RecurringItem::find_by_id(id).one(db).await.map_err(Into::into)
}

async fn get_owned_item(
    db: &DatabaseConnection,
    id: i64,
    user_id: &str,
) -> Result<recurring_item::Model> {
    RecurringItem::find_by_id(id)
        .filter(recurring_item::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::RecurringItemNotFound { id })
}

/// All active items of every user, soonest first.
pub async fn get_active_items(db: &DatabaseConnection) -> Result<Vec<recurring_item::Model>> {
    RecurringItem::find()
        .filter(recurring_item::Column::Status.eq(ItemStatus::Active))
        .order_by_asc(recurring_item::Column::NextDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Non-cancelled items of one user, soonest first.
pub async fn get_items_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<recurring_item::Model>> {
    RecurringItem::find()
        .filter(recurring_item::Column::UserId.eq(user_id))
        .filter(recurring_item::Column::Status.ne(ItemStatus::Cancelled))
        .order_by_asc(recurring_item::Column::NextDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies edits to an item owned by `user_id`.
pub async fn update_recurring_item(
    db: &DatabaseConnection,
    config: &AppConfig,
    id: i64,
    user_id: &str,
    changes: RecurringItemChanges,
) -> Result<recurring_item::Model> {
    let existing = get_owned_item(db, id, user_id).await?;
    let mut active: recurring_item::ActiveModel = existing.into();

    if let Some(name) = changes.name {
        validate_name(&name)?;
        active.name = Set(name.trim().to_string());
    }
    if let Some(category) = changes.category {
        config.ensure_category(&category)?;
        active.category = Set(category);
    }
    if let Some(amount) = changes.amount {
        validate_amount(amount)?;
        active.amount = Set(amount);
    }
    if let Some(frequency) = changes.frequency {
        active.frequency = Set(frequency.as_str().to_string());
    }
    if let Some(next_date) = changes.next_date {
        active.next_date = Set(next_date);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    info!("Updated recurring item {id}");
    Ok(updated)
}

/// Changes the status of an item owned by `user_id`.
///
/// Cancelled items cannot be reactivated.
pub async fn set_item_status(
    db: &DatabaseConnection,
    id: i64,
    user_id: &str,
    status: ItemStatus,
) -> Result<recurring_item::Model> {
    let existing = get_owned_item(db, id, user_id).await?;
    if existing.status == ItemStatus::Cancelled && status != ItemStatus::Cancelled {
        return Err(Error::Config {
            message: format!("Recurring item {id} is cancelled"),
        });
    }

    let mut active: recurring_item::ActiveModel = existing.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!("Recurring item {id} is now {status:?}");
    Ok(updated)
}

/// Writes the new schedule of a processed item.
pub async fn update_scheduling(
    db: &DatabaseConnection,
    id: i64,
    update: SchedulingUpdate,
) -> Result<()> {
    let existing = RecurringItem::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::RecurringItemNotFound { id })?;

    let mut active: recurring_item::ActiveModel = existing.into();
    active.next_date = Set(update.next_date);
    active.last_processed_date = Set(Some(update.last_processed_date));
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    Ok(())
}

/// Remembers that a reminder went out for the occurrence at `next_date`.
pub async fn mark_reminded(
    db: &DatabaseConnection,
    id: i64,
    next_date: DateTime<Utc>,
) -> Result<()> {
    let existing = RecurringItem::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::RecurringItemNotFound { id })?;

    let mut active: recurring_item::ActiveModel = existing.into();
    active.last_reminded_for = Set(Some(next_date));
    active.update(db).await?;
    Ok(())
}
