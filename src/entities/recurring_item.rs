//! Recurring item entity - A periodic expense template such as a subscription.
//!
//! `frequency` is kept as text rather than an active enum so that rows written
//! with an unknown frequency still load; the scheduler treats those as monthly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a recurring item. Only `Active` items are scanned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Scanned and charged when due
    #[sea_orm(string_value = "active")]
    Active,
    /// Temporarily excluded from scans
    #[sea_orm(string_value = "paused")]
    Paused,
    /// Permanently excluded from scans
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ItemStatus {
    /// Lowercase name, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Recurring item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_items")]
pub struct Model {
    /// Unique identifier for the recurring item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user id of the owner
    pub user_id: String,
    /// Free-text label (e.g., "Netflix")
    pub name: String,
    /// Category id from the configured category list
    pub category: String,
    /// Amount charged per occurrence, always positive
    pub amount: f64,
    /// One of `daily`, `weekly`, `biweekly`, `monthly`, `quarterly`, `biannual`, `yearly`
    pub frequency: String,
    /// Next scheduled occurrence
    pub next_date: DateTimeUtc,
    /// Lifecycle state
    pub status: ItemStatus,
    /// When this item last produced a transaction
    pub last_processed_date: Option<DateTimeUtc>,
    /// The `next_date` the last upcoming-charge reminder was sent for
    pub last_reminded_for: Option<DateTimeUtc>,
    /// Creation time
    pub created_at: DateTimeUtc,
    /// Last modification time
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `RecurringItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One recurring item has produced many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
