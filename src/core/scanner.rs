//! Due-item scanner - one check cycle over active recurring items.
//!
//! Each active item is classified against `now` by calendar day:
//!
//! - **due** when its next date is today or earlier: an expense is recorded,
//!   the item's next date advances one period from its *previous* next date and
//!   the user gets a confirmation;
//! - **upcoming** when it falls within the reminder window: the user gets a
//!   reminder (on every scan unless `dedupe_reminders` is set);
//! - otherwise it is left alone.
//!
//! Due items are processed one after another so that budget totals seen by the
//! notifier include the charges booked earlier in the same scan. A failure on
//! one item is logged and recorded in [`ScanOutcome::failed`]; the item stays
//! unadvanced and the scan moves on.
//!
//! Each due item is reloaded just before booking, so an item paused, cancelled
//! or rescheduled after the scan started is skipped instead of charged.
//! Only the store calls of a charge are bounded by the scan's call timeout.
//! Budget alerts and confirmations use their own timeouts, and a slow alert
//! channel never fails a charge.
//!
//! Booking happens before the date advances. If a previous scan booked the
//! charge but could not advance the date, the next scan finds that charge by
//! `(recurring_id, scheduled_for)` and only advances, so a period is never
//! charged twice and never skipped.

use super::{
    notifications::Notifications,
    recurrence::compute_next_occurrence_from_text,
    report::format_days_until,
    stores::{NewTransaction, RecurringItemStore, SchedulingUpdate, Severity, bounded},
    transaction::TransactionService,
};
use crate::{
    config::AppConfig,
    entities::{ItemStatus, RecurringItemModel, TransactionModel, TransactionType},
    errors::Result,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// Suffix appended to the item name in booked transactions.
pub const RECURRING_DESCRIPTION_SUFFIX: &str = " (Recurrente)";

/// Where an item stands relative to the scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Scheduled today or earlier
    Due,
    /// Scheduled within the reminder window
    Upcoming {
        /// Calendar days until the charge
        days_until: i64,
    },
    /// Nothing to do this cycle
    Dormant,
}

/// Calendar days from `now` to the item's next date (negative when overdue).
#[must_use]
pub fn days_until(item: &RecurringItemModel, now: DateTime<Utc>) -> i64 {
    (item.next_date.date_naive() - now.date_naive()).num_days()
}

/// Classifies an item. Inactive items are always dormant.
#[must_use]
pub fn classify(
    item: &RecurringItemModel,
    now: DateTime<Utc>,
    reminder_window_days: i64,
) -> Classification {
    if item.status != ItemStatus::Active {
        return Classification::Dormant;
    }
    match days_until(item, now) {
        d if d <= 0 => Classification::Due,
        d if d <= reminder_window_days => Classification::Upcoming { days_until: d },
        _ => Classification::Dormant,
    }
}

/// Active items charging within `horizon_days` of `now`, soonest first.
#[must_use]
pub fn upcoming_charges(
    items: Vec<RecurringItemModel>,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Vec<UpcomingCharge> {
    let mut upcoming: Vec<UpcomingCharge> = items
        .into_iter()
        .filter(|item| item.status == ItemStatus::Active)
        .filter_map(|item| {
            let days = days_until(&item, now);
            (days <= horizon_days).then_some(UpcomingCharge {
                days_until: days.max(0),
                item,
            })
        })
        .collect();
    upcoming.sort_by_key(|c| c.item.next_date);
    upcoming
}

/// Builds the expense booked for a due item.
#[must_use]
pub fn charge_for(item: &RecurringItemModel, now: DateTime<Utc>) -> NewTransaction {
    NewTransaction {
        user_id: item.user_id.clone(),
        transaction_type: TransactionType::Expense,
        category: item.category.clone(),
        amount: item.amount,
        description: format!("{}{RECURRING_DESCRIPTION_SUFFIX}", item.name),
        date: now,
        recurring_id: Some(item.id),
        scheduled_for: Some(item.next_date),
    }
}

/// An item charged during the scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedCharge {
    /// The item with its new schedule
    pub item: RecurringItemModel,
    /// Scheduled date that was charged
    pub charged_for: DateTime<Utc>,
    /// Transaction booked by this scan; `None` when an earlier scan had already booked it
    pub transaction: Option<TransactionModel>,
}

/// An item that will be charged soon.
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingCharge {
    /// The item
    pub item: RecurringItemModel,
    /// Calendar days until the charge
    pub days_until: i64,
}

/// An item that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    /// Item id
    pub item_id: i64,
    /// Why it failed
    pub reason: String,
}

/// Result of one scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Due items that were charged and advanced
    pub processed: Vec<ProcessedCharge>,
    /// Items inside the reminder window
    pub upcoming: Vec<UpcomingCharge>,
    /// Due items left unadvanced because a call failed
    pub failed: Vec<ScanFailure>,
    /// Items skipped because they have no owner, or were paused, cancelled or
    /// rescheduled while the scan was running
    pub skipped: Vec<i64>,
}

/// Releases the scan-in-progress flag when dropped.
#[derive(Debug)]
pub struct ScanGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs check cycles over recurring items.
#[derive(Clone)]
pub struct DueItemScanner {
    items: Arc<dyn RecurringItemStore>,
    transactions: TransactionService,
    notifications: Notifications,
    config: Arc<AppConfig>,
    in_progress: Arc<AtomicBool>,
}

impl DueItemScanner {
    /// Wires the scanner to its collaborators.
    #[must_use]
    pub fn new(
        items: Arc<dyn RecurringItemStore>,
        transactions: TransactionService,
        notifications: Notifications,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            items,
            transactions,
            notifications,
            config,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the scan-in-progress flag, or returns `None` if a scan is running.
    #[must_use]
    pub fn try_begin(&self) -> Option<ScanGuard> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard {
                flag: Arc::clone(&self.in_progress),
            })
    }

    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        bounded(self.config.scheduler.call_timeout(), operation, future).await
    }

    /// Runs one check cycle at `now`.
    ///
    /// Returns `Ok(None)` without doing anything if another scan is still running.
    ///
    /// # Errors
    /// Fails only when the list of active items cannot be loaded.
    #[instrument(skip(self))]
    pub async fn scan(&self, now: DateTime<Utc>) -> Result<Option<ScanOutcome>> {
        let Some(_guard) = self.try_begin() else {
            warn!("A scan is already in progress, skipping");
            return Ok(None);
        };

        let items = self
            .call("list active recurring items", self.items.list_active())
            .await?;
        let window = self.config.scheduler.reminder_window_days;
        let mut outcome = ScanOutcome::default();

        for item in items {
            if item.user_id.trim().is_empty() {
                warn!("Recurring item {} has no owner, skipping", item.id);
                outcome.skipped.push(item.id);
                continue;
            }

            match classify(&item, now, window) {
                Classification::Due => {
                    let item_id = item.id;
                    match self.process_due(item, now).await {
                        Ok(Some(processed)) => outcome.processed.push(processed),
                        Ok(None) => outcome.skipped.push(item_id),
                        Err(e) => {
                            warn!("Recurring item {item_id} left unprocessed: {e}");
                            outcome.failed.push(ScanFailure {
                                item_id,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                Classification::Upcoming { days_until } => {
                    self.remind(&item, days_until).await;
                    outcome.upcoming.push(UpcomingCharge { item, days_until });
                }
                Classification::Dormant => {}
            }
        }

        info!(
            "Scan finished: {} processed, {} upcoming, {} failed, {} skipped",
            outcome.processed.len(),
            outcome.upcoming.len(),
            outcome.failed.len(),
            outcome.skipped.len()
        );
        Ok(Some(outcome))
    }

    async fn process_due(
        &self,
        item: RecurringItemModel,
        now: DateTime<Utc>,
    ) -> Result<Option<ProcessedCharge>> {
        // The list was loaded at the start of the scan; the item may have been
        // paused, cancelled or rescheduled since.
        let current = self
            .call("reload recurring item", self.items.get_item(item.id))
            .await?;
        let Some(item) = current else {
            info!("Recurring item {} was deleted during the scan", item.id);
            return Ok(None);
        };
        let window = self.config.scheduler.reminder_window_days;
        if classify(&item, now, window) != Classification::Due {
            info!(
                "Recurring item {} is no longer due ({:?}), not charging",
                item.id, item.status
            );
            return Ok(None);
        }

        let charged_for = item.next_date;
        let already_booked = self
            .call(
                "find scheduled charge",
                self.transactions
                    .store()
                    .find_scheduled_charge(item.id, charged_for),
            )
            .await?;

        let transaction = if let Some(existing) = already_booked {
            warn!(
                "Recurring item {} was already charged for {} (transaction {}), advancing only",
                item.id, charged_for, existing.id
            );
            None
        } else {
            let created = self
                .call(
                    "create transaction",
                    self.transactions
                        .store()
                        .create_transaction(charge_for(&item, now)),
                )
                .await?;
            // Not bounded by the scanner's timeout: the notifier times its own
            // store and sink calls and only logs their failures.
            self.transactions.check_budgets(&created).await;
            Some(created)
        };

        let next_date = compute_next_occurrence_from_text(charged_for, &item.frequency);
        self.call(
            "update recurring item schedule",
            self.items.update_scheduling(
                item.id,
                SchedulingUpdate {
                    next_date,
                    last_processed_date: now,
                },
            ),
        )
        .await?;
        debug!("Recurring item {} advanced to {}", item.id, next_date);

        let category = self.config.category_name(&item.category);
        self.notifications
            .send(
                Severity::Info,
                "Recurring charge recorded",
                &format!(
                    "{}: ${:.2} charged to {}. Next charge on {}.",
                    item.name,
                    item.amount,
                    category,
                    next_date.format("%Y-%m-%d")
                ),
            )
            .await;

        Ok(Some(ProcessedCharge {
            item: RecurringItemModel {
                next_date,
                last_processed_date: Some(now),
                ..item
            },
            charged_for,
            transaction,
        }))
    }

    async fn remind(&self, item: &RecurringItemModel, days_until: i64) {
        let dedupe = self.config.scheduler.dedupe_reminders;
        if dedupe && item.last_reminded_for == Some(item.next_date) {
            debug!("Reminder for item {} already sent", item.id);
            return;
        }

        self.notifications
            .send(
                Severity::Warning,
                "Upcoming recurring charge",
                &format!(
                    "{} (${:.2}) will be charged {} on {}.",
                    item.name,
                    item.amount,
                    format_days_until(days_until),
                    item.next_date.format("%Y-%m-%d")
                ),
            )
            .await;

        if dedupe {
            if let Err(e) = self
                .call(
                    "mark reminder sent",
                    self.items.mark_reminded(item.id, item.next_date),
                )
                .await
            {
                warn!("Could not record reminder for item {}: {}", item.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::config::SchedulerSettings;
    use crate::core::{
        notifier::BudgetNotifier, recurring, stores::SeaOrmStore, tracking, transaction,
    };
    use crate::entities::{Transaction, transaction as transaction_entity};
    use crate::test_utils::*;
    use chrono::{Duration, TimeZone};
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    fn now() -> DateTime<Utc> {
        ts(2024, 3, 10)
    }

    async fn charges_for(
        db: &sea_orm::DatabaseConnection,
        item_id: i64,
    ) -> Vec<transaction_entity::Model> {
        Transaction::find()
            .filter(transaction_entity::Column::RecurringId.eq(item_id))
            .all(db)
            .await
            .unwrap()
    }

    #[test]
    fn test_classify() {
        let item = item_model(1, "monthly", ts(2024, 3, 10));
        assert_eq!(classify(&item, now(), 2), Classification::Due);

        let overdue = item_model(1, "monthly", ts(2024, 1, 1));
        assert_eq!(classify(&overdue, now(), 2), Classification::Due);

        // Later the same day still counts as due
        let later_today = item_model(1, "monthly", now() + Duration::hours(5));
        assert_eq!(classify(&later_today, now(), 2), Classification::Due);

        let tomorrow = item_model(1, "monthly", ts(2024, 3, 11));
        assert_eq!(
            classify(&tomorrow, now(), 2),
            Classification::Upcoming { days_until: 1 }
        );

        let edge = item_model(1, "monthly", ts(2024, 3, 12));
        assert_eq!(
            classify(&edge, now(), 2),
            Classification::Upcoming { days_until: 2 }
        );

        let far = item_model(1, "monthly", ts(2024, 3, 13));
        assert_eq!(classify(&far, now(), 2), Classification::Dormant);

        let mut paused = item_model(1, "monthly", ts(2024, 1, 1));
        paused.status = ItemStatus::Paused;
        assert_eq!(classify(&paused, now(), 2), Classification::Dormant);
    }

    #[test]
    fn test_charge_for_builds_expense() {
        let item = item_model(7, "monthly", ts(2024, 3, 1));
        let charge = charge_for(&item, now());
        assert_eq!(charge.transaction_type, TransactionType::Expense);
        assert_eq!(charge.description, "Item 7 (Recurrente)");
        assert_eq!(charge.amount, item.amount);
        assert_eq!(charge.category, item.category);
        assert_eq!(charge.date, now());
        assert_eq!(charge.recurring_id, Some(7));
        assert_eq!(charge.scheduled_for, Some(ts(2024, 3, 1)));
    }

    #[test]
    fn test_upcoming_charges() {
        let mut cancelled = item_model(4, "monthly", ts(2024, 3, 11));
        cancelled.status = ItemStatus::Cancelled;
        let items = vec![
            item_model(1, "monthly", ts(2024, 3, 20)),
            item_model(2, "monthly", ts(2024, 3, 9)),
            item_model(3, "monthly", ts(2024, 5, 1)),
            cancelled,
        ];

        let upcoming = upcoming_charges(items, now(), 30);
        let ids: Vec<i64> = upcoming.iter().map(|c| c.item.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(upcoming[0].days_until, 0);
        assert_eq!(upcoming[1].days_until, 10);
    }

    #[tokio::test]
    async fn test_scan_processes_due_and_reports_upcoming() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());

        let netflix = create_test_item(&db, "Netflix", "monthly", ts(2024, 3, 1)).await?;
        let gym = create_test_item(&db, "Gym", "weekly", ts(2024, 3, 8)).await?;
        let spotify = create_test_item(&db, "Spotify", "monthly", now() + Duration::days(1)).await?;

        let outcome = scanner.scan(now()).await?.unwrap();

        assert_eq!(outcome.processed.len(), 2);
        assert_eq!(outcome.upcoming.len(), 1);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.upcoming[0].item.id, spotify.id);
        assert_eq!(outcome.upcoming[0].days_until, 1);

        // Advanced one period from the original next date, not from now
        let netflix = recurring::get_item_by_id(&db, netflix.id).await?.unwrap();
        assert_eq!(netflix.next_date, ts(2024, 4, 1));
        assert_eq!(netflix.last_processed_date, Some(now()));
        let gym = recurring::get_item_by_id(&db, gym.id).await?.unwrap();
        assert_eq!(gym.next_date, ts(2024, 3, 15));

        let charges = charges_for(&db, netflix.id).await;
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].description, "Netflix (Recurrente)");
        assert_eq!(charges[0].transaction_type, TransactionType::Expense);
        assert_eq!(charges[0].date, now());
        assert_eq!(charges[0].scheduled_for, Some(ts(2024, 3, 1)));

        let unchanged = recurring::get_item_by_id(&db, spotify.id).await?.unwrap();
        assert_eq!(unchanged.next_date, spotify.next_date);
        assert!(charges_for(&db, spotify.id).await.is_empty());

        // Two confirmations and one reminder
        let titles: Vec<String> = sink.messages().into_iter().map(|m| m.title).collect();
        assert_eq!(
            titles.iter().filter(|t| *t == "Recurring charge recorded").count(),
            2
        );
        assert_eq!(
            titles.iter().filter(|t| *t == "Upcoming recurring charge").count(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_paused_and_cancelled_items_are_ignored() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());

        let paused = create_test_item(&db, "Paused", "monthly", ts(2024, 1, 1)).await?;
        recurring::set_item_status(&db, paused.id, "user1", ItemStatus::Paused).await?;
        let cancelled = create_test_item(&db, "Cancelled", "monthly", ts(2024, 1, 1)).await?;
        recurring::set_item_status(&db, cancelled.id, "user1", ItemStatus::Cancelled).await?;

        let outcome = scanner.scan(now()).await?.unwrap();

        assert!(outcome.processed.is_empty());
        assert!(outcome.upcoming.is_empty());
        for id in [paused.id, cancelled.id] {
            assert!(charges_for(&db, id).await.is_empty());
            let stored = recurring::get_item_by_id(&db, id).await?.unwrap();
            assert_eq!(stored.next_date, ts(2024, 1, 1));
            assert!(stored.last_processed_date.is_none());
        }
        assert!(sink.messages().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_month_end_item_clamps_to_leap_day() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());

        let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap();
        let item = create_test_item(&db, "Rent", "monthly", jan31).await?;

        scanner.scan(jan31).await?.unwrap();

        let stored = recurring::get_item_by_id(&db, item.id).await?.unwrap();
        assert_eq!(
            stored.next_date,
            Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_late_scan_does_not_compress_schedule() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());
        let item = create_test_item(&db, "Insurance", "monthly", ts(2023, 12, 1)).await?;

        // Each scan books one period and advances one period
        scanner.scan(now()).await?.unwrap();
        assert_eq!(
            recurring::get_item_by_id(&db, item.id).await?.unwrap().next_date,
            ts(2024, 1, 1)
        );
        scanner.scan(now()).await?.unwrap();
        assert_eq!(
            recurring::get_item_by_id(&db, item.id).await?.unwrap().next_date,
            ts(2024, 2, 1)
        );

        let charges = charges_for(&db, item.id).await;
        let scheduled: Vec<_> = charges.iter().map(|c| c.scheduled_for).collect();
        assert_eq!(scheduled, vec![Some(ts(2023, 12, 1)), Some(ts(2024, 1, 1))]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_frequency_advances_monthly() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());
        let item = create_test_item(&db, "Legacy", "every-so-often", ts(2024, 3, 3)).await?;

        let outcome = scanner.scan(now()).await?.unwrap();

        assert_eq!(outcome.processed.len(), 1);
        assert_eq!(outcome.processed[0].item.next_date, ts(2024, 4, 3));
        let stored = recurring::get_item_by_id(&db, item.id).await?.unwrap();
        assert_eq!(stored.next_date, ts(2024, 4, 3));
        Ok(())
    }

    #[tokio::test]
    async fn test_ownerless_item_is_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());
        let orphan = create_test_item_for(&db, "", "Orphan", "monthly", ts(2024, 3, 1)).await?;
        let owned = create_test_item(&db, "Owned", "monthly", ts(2024, 3, 1)).await?;

        let outcome = scanner.scan(now()).await?.unwrap();

        assert_eq!(outcome.skipped, vec![orphan.id]);
        assert_eq!(outcome.processed.len(), 1);
        assert_eq!(outcome.processed[0].item.id, owned.id);
        assert!(charges_for(&db, orphan.id).await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reminders_repeat_by_default() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());
        create_test_item(&db, "Spotify", "monthly", ts(2024, 3, 12)).await?;

        scanner.scan(now()).await?.unwrap();
        scanner.scan(now()).await?.unwrap();

        assert_eq!(sink.messages().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_reminders_deduplicated_when_enabled() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let settings = SchedulerSettings {
            dedupe_reminders: true,
            ..SchedulerSettings::default()
        };
        let scanner = test_scanner(&db, &sink, settings);
        let item = create_test_item(&db, "Spotify", "monthly", ts(2024, 3, 12)).await?;

        let first = scanner.scan(now()).await?.unwrap();
        let second = scanner.scan(now() + Duration::hours(3)).await?.unwrap();

        // Still reported as upcoming, but only one reminder went out
        assert_eq!(first.upcoming.len(), 1);
        assert_eq!(second.upcoming.len(), 1);
        assert_eq!(sink.messages().len(), 1);
        let stored = recurring::get_item_by_id(&db, item.id).await?.unwrap();
        assert_eq!(stored.last_reminded_for, Some(ts(2024, 3, 12)));
        Ok(())
    }

    #[tokio::test]
    async fn test_second_scan_while_running_is_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());
        let item = create_test_item(&db, "Netflix", "monthly", ts(2024, 3, 1)).await?;

        let guard = scanner.try_begin().unwrap();
        assert!(scanner.clone().scan(now()).await?.is_none());
        assert!(charges_for(&db, item.id).await.is_empty());

        drop(guard);
        assert!(scanner.scan(now()).await?.is_some());
        assert_eq!(charges_for(&db, item.id).await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_advance_is_not_charged_twice() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let store = Arc::new(SeaOrmStore::new(db.clone()));
        let flaky = Arc::new(FlakyRecurringStore::new(store.clone()));
        let scanner = DueItemScanner::new(
            flaky.clone(),
            test_transaction_service(&db, &sink),
            recording_notifications(&sink),
            Arc::new(AppConfig::default()),
        );
        let item = create_test_item(&db, "Netflix", "monthly", ts(2024, 3, 1)).await?;
        let other = create_test_item(&db, "Gym", "monthly", ts(2024, 3, 2)).await?;

        // First scan: Netflix is booked but its date cannot be saved
        flaky.fail_updates_for(item.id);
        let outcome = scanner.scan(now()).await?.unwrap();
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].item_id, item.id);
        assert_eq!(outcome.processed.len(), 1);
        assert_eq!(outcome.processed[0].item.id, other.id);
        assert_eq!(charges_for(&db, item.id).await.len(), 1);
        assert_eq!(
            recurring::get_item_by_id(&db, item.id).await?.unwrap().next_date,
            ts(2024, 3, 1)
        );

        // Second scan: the existing charge is found, only the date advances
        flaky.heal();
        let outcome = scanner.scan(now()).await?.unwrap();
        assert_eq!(outcome.processed.len(), 1);
        assert!(outcome.processed[0].transaction.is_none());
        assert_eq!(charges_for(&db, item.id).await.len(), 1);
        assert_eq!(
            recurring::get_item_by_id(&db, item.id).await?.unwrap().next_date,
            ts(2024, 4, 1)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_store_times_out_without_aborting_scan() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let store = Arc::new(SeaOrmStore::new(db.clone()));
        let flaky = Arc::new(FlakyRecurringStore::new(store.clone()));
        let config = AppConfig {
            scheduler: SchedulerSettings {
                call_timeout_ms: 200,
                ..SchedulerSettings::default()
            },
            ..AppConfig::default()
        };
        let scanner = DueItemScanner::new(
            flaky.clone(),
            test_transaction_service(&db, &sink),
            recording_notifications(&sink),
            Arc::new(config),
        );
        let slow = create_test_item(&db, "Slow", "monthly", ts(2024, 3, 1)).await?;
        let fast = create_test_item(&db, "Fast", "monthly", ts(2024, 3, 2)).await?;

        flaky.stall_updates_for(slow.id);
        let outcome = scanner.scan(now()).await?.unwrap();

        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].reason.contains("timed out"));
        assert_eq!(outcome.processed.len(), 1);
        assert_eq!(outcome.processed[0].item.id, fast.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_stalled_alert_channel_does_not_fail_charge() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let config = Arc::new(AppConfig {
            scheduler: SchedulerSettings {
                call_timeout_ms: 200,
                ..SchedulerSettings::default()
            },
            ..AppConfig::default()
        });
        let notifications = Notifications::new(config.scheduler.call_timeout())
            .with_sink(Arc::new(StallingSink))
            .with_sink(Arc::new(sink.clone()));
        let store = Arc::new(SeaOrmStore::new(db.clone()));
        let notifier = BudgetNotifier::new(
            store.clone(),
            store.clone(),
            store.clone(),
            notifications.clone(),
            Arc::clone(&config),
        );
        let scanner = DueItemScanner::new(
            store.clone(),
            TransactionService::new(store, notifier),
            notifications,
            config,
        );
        let budget = create_test_budget(&db, "user1", "subscriptions", 10.0, 2024, Some(3)).await?;
        let item = create_test_item_priced(&db, "Music", 9.0, ts(2024, 3, 5)).await?;

        let outcome = scanner.scan(now()).await?.unwrap();

        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.processed.len(), 1);
        assert_eq!(charges_for(&db, item.id).await.len(), 1);
        assert_eq!(
            recurring::get_item_by_id(&db, item.id).await?.unwrap().next_date,
            ts(2024, 4, 5)
        );

        // The alert is remembered even though one channel never answered
        let record = tracking::get_record(&db, budget.id).await?;
        assert!(record.sent_80 && record.sent_90);
        assert!(!record.sent_100);

        let titles: Vec<String> = sink.messages().into_iter().map(|m| m.title).collect();
        assert_eq!(
            titles,
            vec![
                "Budget alert: Subscriptions (90%)".to_string(),
                "Recurring charge recorded".to_string()
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_items_changed_after_listing_are_not_charged() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let kept = create_test_item(&db, "Netflix", "monthly", ts(2024, 3, 1)).await?;
        let paused = create_test_item(&db, "Gym", "monthly", ts(2024, 3, 2)).await?;
        let cancelled = create_test_item(&db, "Cloud", "monthly", ts(2024, 3, 3)).await?;
        let moved = create_test_item(&db, "Music", "monthly", ts(2024, 3, 4)).await?;

        let store = Arc::new(SeaOrmStore::new(db.clone()));
        let listed = store.list_active().await?;

        // The user acts while the scan is working through its list
        recurring::set_item_status(&db, paused.id, "user1", ItemStatus::Paused).await?;
        recurring::set_item_status(&db, cancelled.id, "user1", ItemStatus::Cancelled).await?;
        store
            .update_scheduling(
                moved.id,
                SchedulingUpdate {
                    next_date: ts(2024, 3, 20),
                    last_processed_date: ts(2024, 3, 9),
                },
            )
            .await?;

        let scanner = DueItemScanner::new(
            Arc::new(SnapshotRecurringStore::new(store, listed)),
            test_transaction_service(&db, &sink),
            recording_notifications(&sink),
            Arc::new(AppConfig::default()),
        );
        let outcome = scanner.scan(now()).await?.unwrap();

        let processed: Vec<i64> = outcome.processed.iter().map(|p| p.item.id).collect();
        assert_eq!(processed, vec![kept.id]);
        assert_eq!(outcome.skipped, vec![paused.id, cancelled.id, moved.id]);
        assert!(outcome.failed.is_empty());

        for id in [paused.id, cancelled.id, moved.id] {
            assert!(charges_for(&db, id).await.is_empty());
        }
        assert_eq!(
            recurring::get_item_by_id(&db, paused.id).await?.unwrap().next_date,
            ts(2024, 3, 2)
        );
        assert_eq!(
            recurring::get_item_by_id(&db, moved.id).await?.unwrap().next_date,
            ts(2024, 3, 20)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_due_charges_feed_budget_alerts() -> Result<()> {
        let db = setup_test_db().await?;
        let sink = RecordingSink::default();
        let scanner = test_scanner(&db, &sink, SchedulerSettings::default());
        create_test_budget(&db, "user1", "subscriptions", 20.0, 2024, Some(3)).await?;
        transaction::create_transaction(
            &db,
            new_expense("user1", "subscriptions", 10.0, ts(2024, 3, 2)),
        )
        .await?;

        // Two items in the same category; the second pushes spending past 100%
        create_test_item_priced(&db, "Music", 7.0, ts(2024, 3, 5)).await?;
        create_test_item_priced(&db, "Video", 5.0, ts(2024, 3, 6)).await?;

        scanner.scan(now()).await?.unwrap();

        let alerts: Vec<String> = sink
            .messages()
            .into_iter()
            .map(|m| m.title)
            .filter(|t| t.starts_with("Budget"))
            .collect();
        assert_eq!(
            alerts,
            vec![
                "Budget alert: Subscriptions (80%)".to_string(),
                "Budget exceeded: Subscriptions (100%)".to_string()
            ]
        );
        Ok(())
    }
}
