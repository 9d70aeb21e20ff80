//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod budget;
pub mod notification_tracking;
pub mod recurring_item;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use budget::{
    BudgetPeriod, Column as BudgetColumn, Entity as Budget, Model as BudgetModel,
};
pub use notification_tracking::{
    Column as NotificationTrackingColumn, Entity as NotificationTracking,
    Model as NotificationTrackingModel,
};
pub use recurring_item::{
    Column as RecurringItemColumn, Entity as RecurringItem, ItemStatus,
    Model as RecurringItemModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
    TransactionType,
};
