//! Budget-threshold notifier.
//!
//! Loads what [`thresholds::evaluate`] needs from the stores, applies the
//! tracking updates it returns and delivers the alerts. Each budget is handled
//! on its own: a store failure for one budget is logged and the others are
//! still evaluated.

use super::{
    notifications::Notifications,
    stores::{
        BudgetStore, NotificationTrackingStore, TransactionFilter, TransactionStore, bounded,
    },
    thresholds::{self, BudgetAlert, ThresholdDecision, TrackingUpdate, budget_window},
};
use crate::{
    config::AppConfig,
    entities::{BudgetModel, TransactionModel, TransactionType},
    errors::Result,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Evaluates budget thresholds after a transaction is stored.
#[derive(Clone)]
pub struct BudgetNotifier {
    budgets: Arc<dyn BudgetStore>,
    transactions: Arc<dyn TransactionStore>,
    tracking: Arc<dyn NotificationTrackingStore>,
    notifications: Notifications,
    config: Arc<AppConfig>,
}

impl BudgetNotifier {
    /// Wires the notifier to its collaborators.
    #[must_use]
    pub fn new(
        budgets: Arc<dyn BudgetStore>,
        transactions: Arc<dyn TransactionStore>,
        tracking: Arc<dyn NotificationTrackingStore>,
        notifications: Notifications,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            budgets,
            transactions,
            tracking,
            notifications,
            config,
        }
    }

    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        bounded(self.config.scheduler.call_timeout(), operation, future).await
    }

    async fn scope_transactions(
        &self,
        budget: &BudgetModel,
        transaction: &TransactionModel,
    ) -> Result<Vec<TransactionModel>> {
        let Some((from, until)) = budget_window(budget) else {
            return Ok(vec![transaction.clone()]);
        };
        let filter = TransactionFilter {
            user_id: budget.user_id.clone(),
            category: Some(budget.category_id.clone()),
            transaction_type: Some(TransactionType::Expense),
            from,
            until,
        };
        let mut in_scope = self
            .call(
                "list budget transactions",
                self.transactions.list_transactions(&filter),
            )
            .await?;
        if !in_scope.iter().any(|t| t.id == transaction.id) {
            in_scope.push(transaction.clone());
        }
        Ok(in_scope)
    }

    async fn apply(&self, budget_id: i64, decision: &ThresholdDecision) -> Result<()> {
        match decision.update {
            TrackingUpdate::Unchanged => Ok(()),
            TrackingUpdate::MarkSent { up_to, percentage } => {
                self.call(
                    "mark alert sent",
                    self.tracking.mark_sent(budget_id, up_to, percentage),
                )
                .await
            }
            TrackingUpdate::Reset { percentage } => {
                self.call(
                    "reset alert tracking",
                    self.tracking.reset_if_below(budget_id, percentage),
                )
                .await
            }
        }
    }

    /// Evaluates every enabled budget covering `transaction` and sends alerts
    /// for newly crossed thresholds. Returns the alerts that were sent.
    #[instrument(skip(self, transaction), fields(transaction_id = transaction.id))]
    pub async fn evaluate(&self, transaction: &TransactionModel) -> Result<Vec<BudgetAlert>> {
        if transaction.transaction_type != TransactionType::Expense {
            return Ok(Vec::new());
        }

        let budgets: Vec<BudgetModel> = self
            .call(
                "list enabled budgets",
                self.budgets.list_enabled(&transaction.user_id),
            )
            .await?
            .into_iter()
            .filter(|b| thresholds::budget_covers(b, transaction))
            .collect();
        if budgets.is_empty() {
            debug!("No budget covers '{}'", transaction.category);
            return Ok(Vec::new());
        }

        let category_name = self.config.category_name(&transaction.category).to_string();
        let mut sent = Vec::new();

        for budget in budgets {
            let gathered = async {
                let in_scope = self.scope_transactions(&budget, transaction).await?;
                let record = self
                    .call("load alert tracking", self.tracking.get_record(budget.id))
                    .await?;
                Result::Ok((in_scope, record))
            }
            .await;
            let (in_scope, record) = match gathered {
                Ok(data) => data,
                Err(e) => {
                    warn!("Skipping budget {}: {}", budget.id, e);
                    continue;
                }
            };

            let records = HashMap::from([(budget.id, record)]);
            let decisions = thresholds::evaluate(
                transaction,
                std::slice::from_ref(&budget),
                &in_scope,
                &records,
                &category_name,
            );

            for (budget_id, decision) in decisions {
                if let Err(e) = self.apply(budget_id, &decision).await {
                    warn!("Failed to update alert tracking for budget {budget_id}: {e}");
                }
                if let Some(alert) = &decision.alert {
                    self.notifications
                        .send(alert.severity, &alert.title(), &alert.message())
                        .await;
                }
                if let Some(alert) = decision.alert {
                    sent.push(alert);
                }
            }
        }

        Ok(sent)
    }
}
