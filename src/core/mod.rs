//! Core business logic - framework-agnostic scheduling, budgeting and reporting.
//!
//! The database-facing services (`budget`, `recurring`, `tracking`, `transaction`)
//! are plain async functions over a `DatabaseConnection`. The scheduling pieces
//! (`scanner`, `notifier`) only see the collaborator traits in [`stores`].

/// Budget CRUD and usage
pub mod budget;
/// Notification fan-out and the log sink
pub mod notifications;
/// Budget threshold evaluation after a transaction
pub mod notifier;
/// Frequency parsing and next-occurrence arithmetic
pub mod recurrence;
/// Recurring item CRUD and scheduling writes
pub mod recurring;
/// Text formatting for the bot and logs
pub mod report;
/// Due-item scanning
pub mod scanner;
/// Collaborator traits and their `SeaORM` implementation
pub mod stores;
/// Pure threshold decisions
pub mod thresholds;
/// Per-budget alert bookkeeping
pub mod tracking;
/// Transaction persistence and the recording service
pub mod transaction;
