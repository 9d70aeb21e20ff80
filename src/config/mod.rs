/// Database configuration and connection management
pub mod database;

/// Scheduler, alert channel and category settings loaded from config.toml
pub mod settings;

pub use settings::{AlertSettings, AppConfig, CategoryConfig, SchedulerSettings};
