//! Fan-out of user-facing notifications.
//!
//! Delivery is fire-and-forget: every sink gets the message, a failing or slow
//! sink is logged and skipped, and callers never see the error.

use super::stores::{NotificationSink, Severity, bounded};
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Sink that writes notifications to the application log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, severity: Severity, title: &str, message: &str) -> Result<()> {
        match severity {
            Severity::Info => info!("[{severity}] {title}: {message}"),
            Severity::Warning => warn!("[{severity}] {title}: {message}"),
            Severity::Critical => error!("[{severity}] {title}: {message}"),
        }
        Ok(())
    }
}

/// Delivers every notification to a list of sinks.
#[derive(Clone)]
pub struct Notifications {
    sinks: Vec<Arc<dyn NotificationSink>>,
    timeout: Duration,
}

impl Notifications {
    /// Creates a fan-out with no sinks; each delivery is bounded by `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            sinks: Vec::new(),
            timeout,
        }
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of configured sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no sink is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Sends a message to every sink, logging failures.
    ///
    /// Returns how many sinks accepted the message.
    pub async fn send(&self, severity: Severity, title: &str, message: &str) -> usize {
        let mut delivered = 0;
        for sink in &self.sinks {
            match bounded(self.timeout, "notify", sink.notify(severity, title, message)).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to deliver notification '{title}': {e}"),
            }
        }
        delivered
    }
}
