//! Application settings loaded from config.toml
//!
//! Every section is optional. A missing file yields the defaults so a fresh
//! checkout can start without writing any configuration first.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Check cycle settings
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// External alert channel settings
    #[serde(default)]
    pub alerts: AlertSettings,
    /// Fixed list of categories transactions, budgets and items may use
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings::default(),
            alerts: AlertSettings::default(),
            categories: default_categories(),
        }
    }
}

/// Settings for the due-item scanner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Items due within this many days trigger an upcoming-charge reminder
    pub reminder_window_days: i64,
    /// Send at most one reminder per item and scheduled date
    pub dedupe_reminders: bool,
    /// Upper bound for every store or sink call made during a scan
    pub call_timeout_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            reminder_window_days: 2,
            dedupe_reminders: false,
            call_timeout_ms: 5_000,
        }
    }
}

impl SchedulerSettings {
    /// `call_timeout_ms` as a `Duration`.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Settings for the optional Discord alert channel
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertSettings {
    /// Channel that receives budget alerts and scan summaries; disabled when absent
    pub channel_id: Option<u64>,
}

/// Configuration for a single category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryConfig {
    /// Stable identifier stored on transactions, budgets and items
    pub id: String,
    /// Display name used in notifications
    pub name: String,
}

impl CategoryConfig {
    fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new("food", "Food"),
        CategoryConfig::new("transport", "Transport"),
        CategoryConfig::new("housing", "Housing"),
        CategoryConfig::new("utilities", "Utilities"),
        CategoryConfig::new("entertainment", "Entertainment"),
        CategoryConfig::new("subscriptions", "Subscriptions"),
        CategoryConfig::new("health", "Health"),
        CategoryConfig::new("education", "Education"),
        CategoryConfig::new("shopping", "Shopping"),
        CategoryConfig::new("other", "Other"),
    ]
}

impl AppConfig {
    /// Display name for a category id, falling back to the id itself.
    #[must_use]
    pub fn category_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map_or(id, |c| c.name.as_str())
    }

    /// Returns an error unless `id` is one of the configured categories.
    pub fn ensure_category(&self, id: &str) -> Result<()> {
        if self.categories.iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(Error::UnknownCategory {
                category: id.to_string(),
            })
        }
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads settings from `CONFIG_PATH` (default `./config.toml`), or defaults if it does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_config(&path)
    } else {
        tracing::info!("No configuration file at {path}, using defaults");
        Ok(AppConfig::default())
    }
}
