//! Notification tracking persistence.
//!
//! Stores, per budget, which alert thresholds were already sent during the
//! current period. Records are created on first write; reads of a budget
//! without a record return an empty one.

use super::thresholds::{REARM_BELOW, TrackingUpdate, apply_update};
use crate::{
    entities::{NotificationTracking, notification_tracking},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::{debug, info};

/// Loads the tracking record for a budget, or an empty record if none is stored.
pub async fn get_record(
    db: &DatabaseConnection,
    budget_id: i64,
) -> Result<notification_tracking::Model> {
    Ok(NotificationTracking::find_by_id(budget_id)
        .one(db)
        .await?
        .unwrap_or_else(|| notification_tracking::Model::empty(budget_id)))
}

async fn save_record(
    db: &DatabaseConnection,
    record: notification_tracking::Model,
    exists: bool,
) -> Result<()> {
    let active = notification_tracking::ActiveModel {
        budget_id: Set(record.budget_id),
        sent_80: Set(record.sent_80),
        percentage_80: Set(record.percentage_80),
        sent_90: Set(record.sent_90),
        percentage_90: Set(record.percentage_90),
        sent_100: Set(record.sent_100),
        percentage_100: Set(record.percentage_100),
        updated_at: Set(Utc::now()),
    };
    if exists {
        active.update(db).await?;
    } else {
        active.insert(db).await?;
    }
    Ok(())
}

/// Marks every threshold up to and including `threshold` as sent.
///
/// Flags that are already set keep the percentage they were first set with.
pub async fn mark_sent(
    db: &DatabaseConnection,
    budget_id: i64,
    threshold: u32,
    percentage: f64,
) -> Result<()> {
    let existing = NotificationTracking::find_by_id(budget_id).one(db).await?;
    let exists = existing.is_some();
    let mut record = existing.unwrap_or_else(|| notification_tracking::Model::empty(budget_id));

    apply_update(
        &mut record,
        TrackingUpdate::MarkSent {
            up_to: threshold,
            percentage,
        },
    );
    save_record(db, record, exists).await?;
    info!("Budget {budget_id}: marked {threshold}% alert as sent at {percentage:.1}%");
    Ok(())
}

/// Clears every flag of a budget when `percentage` is below the re-arm level.
pub async fn reset_if_below(
    db: &DatabaseConnection,
    budget_id: i64,
    percentage: f64,
) -> Result<()> {
    if percentage >= REARM_BELOW {
        return Ok(());
    }
    let Some(record) = NotificationTracking::find_by_id(budget_id).one(db).await? else {
        return Ok(());
    };
    if !record.any_sent() {
        return Ok(());
    }

    save_record(db, notification_tracking::Model::empty(budget_id), true).await?;
    debug!("Budget {budget_id}: alerts re-armed at {percentage:.1}%");
    Ok(())
}

/// Removes the tracking record of a budget, if any.
pub async fn delete_record<C>(db: &C, budget_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    NotificationTracking::delete_by_id(budget_id).exec(db).await?;
    Ok(())
}
