//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions come from the loaded configuration and the fixed frequency list,
//! so no database access is needed while the user types.

use crate::{bot::BotData, config::AppConfig, core::recurrence::Frequency, errors::Error};

/// Category ids whose id or display name contains `partial` (case-insensitive).
#[must_use]
pub fn matching_categories(config: &AppConfig, partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    config
        .categories
        .iter()
        .filter(|c| {
            c.id.to_lowercase().contains(&partial_lower)
                || c.name.to_lowercase().contains(&partial_lower)
        })
        .map(|c| c.id.clone())
        .take(25) // Discord autocomplete limit
        .collect()
}

/// Frequency names starting with `partial` (case-insensitive).
#[must_use]
pub fn matching_frequencies(partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    Frequency::ALL
        .iter()
        .map(|f| f.as_str())
        .filter(|name| name.starts_with(&partial_lower))
        .map(str::to_string)
        .collect()
}

/// Provides autocomplete suggestions for category ids.
///
/// # Arguments
/// * `ctx` - The poise context holding the configuration
/// * `partial` - The partial string the user has typed so far
#[allow(clippy::unused_async)]
pub async fn autocomplete_category(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching_categories(&ctx.data().config, partial)
}

/// Provides autocomplete suggestions for recurring charge frequencies.
#[allow(clippy::unused_async)]
pub async fn autocomplete_frequency(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching_frequencies(partial)
}
