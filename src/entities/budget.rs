//! Budget entity - A spending limit for one category over a month or a year.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Scope a budget applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// One calendar month (`year` + `month`)
    #[sea_orm(string_value = "monthly")]
    Monthly,
    /// One calendar year (`year`)
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

/// Budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    /// Unique identifier for the budget
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user id of the owner
    pub user_id: String,
    /// Category id this budget limits
    pub category_id: String,
    /// Spending limit for the period
    pub amount: f64,
    /// Monthly or yearly
    pub period: BudgetPeriod,
    /// Calendar year of the period
    pub year: i32,
    /// Calendar month (1-12), present iff `period` is monthly
    pub month: Option<u32>,
    /// User preference kept for display; alerts always use 80/90/100
    pub alert_threshold: u32,
    /// Disabled budgets are never evaluated
    pub enabled: bool,
    /// Creation time
    pub created_at: DateTimeUtc,
    /// Last modification time
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Budget and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each budget has at most one notification tracking record
    #[sea_orm(has_one = "super::notification_tracking::Entity")]
    NotificationTracking,
}

impl Related<super::notification_tracking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationTracking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
