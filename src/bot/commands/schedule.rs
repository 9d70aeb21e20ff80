//! Check cycle Discord commands - `check_due` and `upcoming`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::{recurring, report, scanner},
        errors::{Error, Result},
    };
    use chrono::Utc;

    /// Default look-ahead for `/upcoming`.
    const DEFAULT_UPCOMING_DAYS: i64 = 7;

    /// Books every recurring charge that is due and reminds about upcoming ones.
    ///
    /// The same check runs once when the bot starts. Running it again is safe:
    /// charges that were already booked are not booked twice.
    #[poise::command(slash_command, prefix_command)]
    pub async fn check_due(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        // Acknowledge command quickly
        ctx.defer().await?;

        match ctx.data().scanner.scan(Utc::now()).await? {
            Some(outcome) => {
                ctx.say(format!(
                    "✅ **Check complete!**\n\n{}",
                    report::format_scan_summary(&outcome)
                ))
                .await?;
            }
            None => {
                ctx.say("ℹ️ A check is already running. Try again in a moment.")
                    .await?;
            }
        }

        Ok(())
    }

    /// Shows your recurring charges coming up in the next few days.
    #[poise::command(slash_command, prefix_command)]
    pub async fn upcoming(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many days to look ahead (default 7)"]
        #[min = 0]
        #[max = 366]
        days: Option<i64>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();
        let horizon = days.unwrap_or(DEFAULT_UPCOMING_DAYS);

        let items = recurring::get_items_for_user(db, &user_id).await?;
        let charges = scanner::upcoming_charges(items, Utc::now(), horizon);

        ctx.say(format!(
            "📅 **Charges in the next {horizon} day(s)**\n{}",
            report::format_upcoming_charges(&charges)
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
