//! Discord alert channel.
//!
//! Posts notifications to one configured text channel through the bot's HTTP
//! client. Delivery errors are returned to the fan-out, which logs them.

use crate::{
    core::stores::{NotificationSink, Severity},
    errors::{Error, Result},
};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Sink posting to a Discord channel.
pub struct DiscordChannelSink {
    http: Arc<serenity::Http>,
    channel: serenity::ChannelId,
}

impl DiscordChannelSink {
    /// Creates a sink for the channel with the given id.
    #[must_use]
    pub fn new(http: Arc<serenity::Http>, channel_id: u64) -> Self {
        Self {
            http,
            channel: serenity::ChannelId::new(channel_id),
        }
    }
}

/// Emoji prefix for a severity.
#[must_use]
pub const fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "ℹ️",
        Severity::Warning => "⚠️",
        Severity::Critical => "🚨",
    }
}

/// Text posted for one notification.
#[must_use]
pub fn format_alert(severity: Severity, title: &str, message: &str) -> String {
    format!("{} **{title}**\n{message}", severity_icon(severity))
}

#[async_trait]
impl NotificationSink for DiscordChannelSink {
    async fn notify(&self, severity: Severity, title: &str, message: &str) -> Result<()> {
        self.channel
            .say(self.http.as_ref(), format_alert(severity, title, message))
            .await
            .map_err(|e| Error::Notification {
                message: e.to_string(),
            })?;
        Ok(())
    }
}
