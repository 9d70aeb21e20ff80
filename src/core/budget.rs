//! Budget business logic - creation, listing, enabling and usage.
//!
//! At most one enabled budget may exist per owner, category and period. The
//! check runs when a budget is created and when a disabled one is re-enabled.

use super::{
    stores::TransactionFilter,
    thresholds::{budget_window, spending_percentage},
    transaction::list_transactions,
};
use crate::{
    config::AppConfig,
    entities::{Budget, BudgetPeriod, TransactionType, budget},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Default value stored in `alert_threshold`.
pub const DEFAULT_ALERT_THRESHOLD: u32 = 80;

/// Input for [`create_budget`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    /// Owner
    pub user_id: String,
    /// Category id
    pub category_id: String,
    /// Spending limit, must be positive
    pub amount: f64,
    /// Monthly or yearly
    pub period: BudgetPeriod,
    /// Calendar year
    pub year: i32,
    /// Calendar month, required iff `period` is monthly
    pub month: Option<u32>,
}

/// Spending of one budget in its period.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetUsage {
    /// The budget
    pub budget: budget::Model,
    /// Expenses in scope
    pub spent: f64,
    /// `spent` as a percentage of the limit; zero for unusable budgets
    pub percentage: f64,
    /// Limit minus spent, negative once exceeded
    pub remaining: f64,
}

/// Human readable scope of a budget, `2024-03` or `2024`.
#[must_use]
pub fn scope_label(period: BudgetPeriod, year: i32, month: Option<u32>) -> String {
    match (period, month) {
        (BudgetPeriod::Monthly, Some(m)) => format!("{year:04}-{m:02}"),
        _ => format!("{year:04}"),
    }
}

fn validate_period(period: BudgetPeriod, month: Option<u32>) -> Result<()> {
    match (period, month) {
        (BudgetPeriod::Monthly, Some(m)) if (1..=12).contains(&m) => Ok(()),
        (BudgetPeriod::Monthly, Some(m)) => Err(Error::InvalidPeriod {
            message: format!("month {m} is not between 1 and 12"),
        }),
        (BudgetPeriod::Monthly, None) => Err(Error::InvalidPeriod {
            message: "monthly budgets need a month".to_string(),
        }),
        (BudgetPeriod::Yearly, None) => Ok(()),
        (BudgetPeriod::Yearly, Some(_)) => Err(Error::InvalidPeriod {
            message: "yearly budgets cannot have a month".to_string(),
        }),
    }
}

async fn find_enabled_duplicate<C>(
    db: &C,
    user_id: &str,
    category_id: &str,
    period: BudgetPeriod,
    year: i32,
    month: Option<u32>,
) -> Result<Option<budget::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .filter(budget::Column::CategoryId.eq(category_id))
        .filter(budget::Column::Period.eq(period))
        .filter(budget::Column::Year.eq(year))
        .filter(budget::Column::Enabled.eq(true));
    query = match month {
        Some(m) => query.filter(budget::Column::Month.eq(m)),
        None => query.filter(budget::Column::Month.is_null()),
    };
    query.one(db).await.map_err(Into::into)
}

/// Creates an enabled budget after validating it and checking for duplicates.
pub async fn create_budget(
    db: &DatabaseConnection,
    config: &AppConfig,
    new: NewBudget,
) -> Result<budget::Model> {
    if new.user_id.trim().is_empty() {
        return Err(Error::Config {
            message: "Budget has no owner".to_string(),
        });
    }
    if !new.amount.is_finite() || new.amount <= 0.0 {
        return Err(Error::InvalidAmount { amount: new.amount });
    }
    config.ensure_category(&new.category_id)?;
    validate_period(new.period, new.month)?;

    // Check and insert in one database transaction
    let txn = db.begin().await?;

    if find_enabled_duplicate(
        &txn,
        &new.user_id,
        &new.category_id,
        new.period,
        new.year,
        new.month,
    )
    .await?
    .is_some()
    {
        return Err(Error::DuplicateBudget {
            category: new.category_id,
            scope: scope_label(new.period, new.year, new.month),
        });
    }

    let now = Utc::now();
    let model = budget::ActiveModel {
        user_id: Set(new.user_id),
        category_id: Set(new.category_id),
        amount: Set(new.amount),
        period: Set(new.period),
        year: Set(new.year),
        month: Set(new.month),
        alert_threshold: Set(DEFAULT_ALERT_THRESHOLD),
        enabled: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let result = model.insert(&txn).await?;
    txn.commit().await?;

    info!(
        "Created budget {} for user {}: {} {:.2} ({})",
        result.id,
        result.user_id,
        result.category_id,
        result.amount,
        scope_label(result.period, result.year, result.month)
    );
    Ok(result)
}

/// Finds a budget by id.
pub async fn get_budget_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<budget::Model>> {
    Budget::find_by_id(id).one(db).await.map_err(Into::into)
}

/// All budgets of a user, newest period first.
pub async fn get_budgets_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<budget::Model>> {
    Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .order_by_desc(budget::Column::Year)
        .order_by_desc(budget::Column::Month)
        .order_by_asc(budget::Column::CategoryId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Enabled budgets of a user.
pub async fn get_enabled_budgets(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<budget::Model>> {
    Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .filter(budget::Column::Enabled.eq(true))
        .order_by_asc(budget::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn get_owned_budget(
    db: &DatabaseConnection,
    id: i64,
    user_id: &str,
) -> Result<budget::Model> {
    Budget::find_by_id(id)
        .filter(budget::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::BudgetNotFound { id })
}

/// Enables or disables a budget owned by `user_id`.
///
/// Enabling fails with [`Error::DuplicateBudget`] if another enabled budget
/// already covers the same category and period.
pub async fn set_budget_enabled(
    db: &DatabaseConnection,
    id: i64,
    user_id: &str,
    enabled: bool,
) -> Result<budget::Model> {
    let existing = get_owned_budget(db, id, user_id).await?;
    if existing.enabled == enabled {
        return Ok(existing);
    }

    if enabled
        && find_enabled_duplicate(
            db,
            &existing.user_id,
            &existing.category_id,
            existing.period,
            existing.year,
            existing.month,
        )
        .await?
        .is_some()
    {
        return Err(Error::DuplicateBudget {
            category: existing.category_id,
            scope: scope_label(existing.period, existing.year, existing.month),
        });
    }

    let mut active: budget::ActiveModel = existing.into();
    active.enabled = Set(enabled);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!("Budget {id} enabled={enabled}");
    Ok(updated)
}

/// Deletes a budget and its notification tracking record.
pub async fn delete_budget(db: &DatabaseConnection, id: i64, user_id: &str) -> Result<()> {
    let existing = get_owned_budget(db, id, user_id).await?;

    let txn = db.begin().await?;
    super::tracking::delete_record(&txn, id).await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    info!("Deleted budget {id}");
    Ok(())
}

/// Computes how much of a budget is used.
pub async fn get_budget_usage(
    db: &DatabaseConnection,
    budget: budget::Model,
) -> Result<BudgetUsage> {
    let spent = match budget_window(&budget) {
        Some((from, until)) => {
            let filter = TransactionFilter {
                user_id: budget.user_id.clone(),
                category: Some(budget.category_id.clone()),
                transaction_type: Some(TransactionType::Expense),
                from,
                until,
            };
            list_transactions(db, &filter)
                .await?
                .iter()
                .map(|t| t.amount)
                .sum()
        }
        None => 0.0,
    };

    Ok(BudgetUsage {
        percentage: spending_percentage(budget.amount, spent).unwrap_or(0.0),
        remaining: budget.amount - spent,
        spent,
        budget,
    })
}
