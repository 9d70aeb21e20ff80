//! Notification tracking entity - Which budget thresholds already alerted.
//!
//! One row per budget, created lazily the first time the budget is evaluated.
//! Flags are cleared together once spending falls back under the lowest threshold.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification tracking database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_tracking")]
pub struct Model {
    /// Budget this record belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub budget_id: i64,
    /// 80% alert already sent
    pub sent_80: bool,
    /// Percentage observed when the 80% flag was set
    pub percentage_80: Option<f64>,
    /// 90% alert already sent
    pub sent_90: bool,
    /// Percentage observed when the 90% flag was set
    pub percentage_90: Option<f64>,
    /// 100% alert already sent
    pub sent_100: bool,
    /// Percentage observed when the 100% flag was set
    pub percentage_100: Option<f64>,
    /// Last modification time
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// A record with no threshold marked, used before the first evaluation.
    #[must_use]
    pub fn empty(budget_id: i64) -> Self {
        Self {
            budget_id,
            sent_80: false,
            percentage_80: None,
            sent_90: false,
            percentage_90: None,
            sent_100: false,
            percentage_100: None,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Whether the alert for `threshold` (80, 90 or 100) was already sent.
    #[must_use]
    pub const fn is_sent(&self, threshold: u32) -> bool {
        match threshold {
            80 => self.sent_80,
            90 => self.sent_90,
            100 => self.sent_100,
            _ => false,
        }
    }

    /// Whether any threshold is currently marked.
    #[must_use]
    pub const fn any_sent(&self) -> bool {
        self.sent_80 || self.sent_90 || self.sent_100
    }
}

/// Defines relationships between `NotificationTracking` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one budget
    #[sea_orm(
        belongs_to = "super::budget::Entity",
        from = "Column::BudgetId",
        to = "super::budget::Column::Id"
    )]
    Budget,
}

impl Related<super::budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
