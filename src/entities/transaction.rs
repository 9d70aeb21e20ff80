//! Transaction entity - Represents every expense and income entry.
//!
//! Transactions booked by the scheduler carry the `recurring_id` of the item
//! that produced them and the `scheduled_for` date of the period they pay for.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a transaction. Budgets only count expenses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money spent
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Money received
    #[sea_orm(string_value = "income")]
    Income,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord user id of the owner
    pub user_id: String,
    /// Expense or income
    pub transaction_type: TransactionType,
    /// Category id
    pub category: String,
    /// Transaction amount, always positive; `transaction_type` gives the direction
    pub amount: f64,
    /// Human-readable description of the transaction
    pub description: String,
    /// When the money moved
    pub date: DateTimeUtc,
    /// Recurring item that produced this transaction, if any
    pub recurring_id: Option<i64>,
    /// Scheduled date of the recurring period this transaction pays for
    pub scheduled_for: Option<DateTimeUtc>,
    /// When the record was stored
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Scheduler-booked transactions belong to one recurring item
    #[sea_orm(
        belongs_to = "super::recurring_item::Entity",
        from = "Column::RecurringId",
        to = "super::recurring_item::Column::Id"
    )]
    RecurringItem,
}

impl Related<super::recurring_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
