//! Transaction business logic.
//!
//! Free functions here are the database layer for transactions. [`TransactionService`]
//! is what the rest of the application uses to record a transaction: it stores it
//! and then lets the budget notifier look at the new spending level.

use super::{
    notifier::BudgetNotifier,
    stores::{NewTransaction, TransactionFilter, TransactionStore},
};
use crate::{
    entities::{Transaction, TransactionType, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use std::sync::Arc;
use tracing::{info, warn};

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Validates and inserts a transaction.
///
/// Amounts are stored positive; `transaction_type` carries the direction.
pub async fn create_transaction(
    db: &DatabaseConnection,
    new: NewTransaction,
) -> Result<transaction::Model> {
    validate_amount(new.amount)?;
    if new.user_id.trim().is_empty() {
        return Err(Error::Config {
            message: "Transaction has no owner".to_string(),
        });
    }

    let model = transaction::ActiveModel {
        user_id: Set(new.user_id),
        transaction_type: Set(new.transaction_type),
        category: Set(new.category),
        amount: Set(new.amount),
        description: Set(new.description),
        date: Set(new.date),
        recurring_id: Set(new.recurring_id),
        scheduled_for: Set(new.scheduled_for),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let result = model.insert(db).await?;
    info!(
        "Created transaction {} for user {}: {:?} {:.2} in '{}'",
        result.id, result.user_id, result.transaction_type, result.amount, result.category
    );
    Ok(result)
}

/// Lists transactions matching the filter, oldest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    filter: &TransactionFilter,
) -> Result<Vec<transaction::Model>> {
    let mut query = Transaction::find()
        .filter(transaction::Column::UserId.eq(filter.user_id.as_str()))
        .filter(transaction::Column::Date.gte(filter.from))
        .filter(transaction::Column::Date.lt(filter.until));

    if let Some(category) = &filter.category {
        query = query.filter(transaction::Column::Category.eq(category.as_str()));
    }
    if let Some(transaction_type) = filter.transaction_type {
        query = query.filter(transaction::Column::TransactionType.eq(transaction_type));
    }

    query
        .order_by_asc(transaction::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Most recent transactions of one user, newest first.
pub async fn get_recent_transactions(
    db: &DatabaseConnection,
    user_id: &str,
    limit: u64,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .order_by_desc(transaction::Column::Date)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds the charge already booked for a recurring item's scheduled date.
pub async fn find_scheduled_charge(
    db: &DatabaseConnection,
    recurring_id: i64,
    scheduled_for: DateTime<Utc>,
) -> Result<Option<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::RecurringId.eq(recurring_id))
        .filter(transaction::Column::ScheduledFor.eq(scheduled_for))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific transaction by its unique ID.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Deletes a transaction owned by `user_id`.
pub async fn delete_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
    user_id: &str,
) -> Result<()> {
    let transaction = Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;

    transaction.delete(db).await?;
    info!("Deleted transaction {transaction_id}");
    Ok(())
}

/// Records transactions and runs the budget notifier on every new expense.
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn TransactionStore>,
    notifier: BudgetNotifier,
}

impl TransactionService {
    /// Builds a service over a store and the notifier to run after each creation.
    #[must_use]
    pub fn new(store: Arc<dyn TransactionStore>, notifier: BudgetNotifier) -> Self {
        Self { store, notifier }
    }

    /// Stores a transaction, then evaluates budget thresholds for it.
    ///
    /// Notifier failures are logged and never undo or fail the creation.
    pub async fn record(&self, new: NewTransaction) -> Result<transaction::Model> {
        let created = self.store.create_transaction(new).await?;
        self.check_budgets(&created).await;
        Ok(created)
    }

    /// Runs the budget notifier for a transaction that is already stored.
    ///
    /// Only expenses are evaluated. Errors are logged.
    pub async fn check_budgets(&self, created: &transaction::Model) {
        if created.transaction_type != TransactionType::Expense {
            return;
        }
        if let Err(e) = self.notifier.evaluate(created).await {
            warn!("Budget evaluation failed for transaction {}: {e}", created.id);
        }
    }

    /// The store transactions are written to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }
}
