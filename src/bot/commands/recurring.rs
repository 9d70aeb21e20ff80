//! Recurring item Discord commands - `/recurring` and its subcommands.
//!
//! Items belong to the user who created them; every subcommand only sees the
//! author's own items.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{is_user_error, parse_date},
            handlers::autocomplete,
        },
        core::{
            recurrence::Frequency,
            recurring::{self, NewRecurringItem, RecurringItemChanges},
            report,
        },
        entities::ItemStatus,
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Parent command for managing recurring charges such as subscriptions.
    #[poise::command(
        slash_command,
        subcommands(
            "recurring_add",
            "recurring_list",
            "recurring_edit",
            "recurring_pause",
            "recurring_resume",
            "recurring_cancel"
        )
    )]
    pub async fn recurring(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Recurring charge management. Available subcommands:\n\
            `/recurring add` - Add a recurring charge\n\
            `/recurring list` - List your recurring charges\n\
            `/recurring edit` - Change a recurring charge\n\
            `/recurring pause` - Stop charging until resumed\n\
            `/recurring resume` - Start charging again\n\
            `/recurring cancel` - Stop charging for good";

        ctx.say(help_text).await?;
        Ok(())
    }

    fn parse_frequency(text: &str) -> Option<Frequency> {
        text.parse().ok()
    }

    /// Adds a recurring charge.
    #[poise::command(slash_command, rename = "add")]
    pub async fn recurring_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Name of the charge (e.g., 'Netflix')"] name: String,
        #[description = "Amount charged each time"] amount: f64,
        #[description = "How often it is charged"]
        #[autocomplete = "autocomplete::autocomplete_frequency"]
        frequency: String,
        #[description = "Category of the expense"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "Date of the next charge (YYYY-MM-DD)"] next_date: String,
    ) -> Result<()> {
        let Some(frequency) = parse_frequency(&frequency) else {
            ctx.say(format!("❌ Unknown frequency '{frequency}'.")).await?;
            return Ok(());
        };
        let Some(next_date) = parse_date(&next_date) else {
            ctx.say("❌ Invalid date: use the YYYY-MM-DD format.").await?;
            return Ok(());
        };

        let data = ctx.data();
        let new = NewRecurringItem {
            user_id: ctx.author().id.to_string(),
            name,
            category,
            amount,
            frequency,
            next_date,
        };

        match recurring::create_recurring_item(&data.database, &data.config, new).await {
            Ok(item) => {
                ctx.say(format!(
                    "✅ Added recurring charge #{}: **{}** ${:.2} {}, next on {}.",
                    item.id,
                    item.name,
                    item.amount,
                    item.frequency,
                    item.next_date.format("%Y-%m-%d")
                ))
                .await?;
            }
            Err(e) if is_user_error(&e) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Lists your recurring charges that are not cancelled.
    #[poise::command(slash_command, rename = "list")]
    pub async fn recurring_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();
        let items = recurring::get_items_for_user(&data.database, &user_id).await?;

        if items.is_empty() {
            ctx.say("🔁 No recurring charges yet. Add one with `/recurring add`.")
                .await?;
            return Ok(());
        }

        let mut message = String::from("🔁 **Your recurring charges**\n");
        for item in &items {
            let _ = writeln!(message, "{}", report::format_recurring_item(item, &data.config));
        }
        ctx.say(message).await?;
        Ok(())
    }

    /// Changes a recurring charge. Only the given fields are updated.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn recurring_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Id of the recurring charge"] id: i64,
        #[description = "New name"] name: Option<String>,
        #[description = "New amount"] amount: Option<f64>,
        #[description = "New frequency"]
        #[autocomplete = "autocomplete::autocomplete_frequency"]
        frequency: Option<String>,
        #[description = "New category"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: Option<String>,
        #[description = "New date of the next charge (YYYY-MM-DD)"] next_date: Option<String>,
    ) -> Result<()> {
        let frequency = match frequency.as_deref().map(parse_frequency) {
            Some(None) => {
                ctx.say("❌ Unknown frequency.").await?;
                return Ok(());
            }
            Some(Some(f)) => Some(f),
            None => None,
        };
        let next_date = match next_date.as_deref().map(parse_date) {
            Some(None) => {
                ctx.say("❌ Invalid date: use the YYYY-MM-DD format.").await?;
                return Ok(());
            }
            Some(Some(d)) => Some(d),
            None => None,
        };

        let data = ctx.data();
        let user_id = ctx.author().id.to_string();
        let changes = RecurringItemChanges {
            name,
            category,
            amount,
            frequency,
            next_date,
        };

        match recurring::update_recurring_item(&data.database, &data.config, id, &user_id, changes)
            .await
        {
            Ok(item) => {
                ctx.say(format!(
                    "✅ Updated: {}",
                    report::format_recurring_item(&item, &data.config)
                ))
                .await?;
            }
            Err(e) if is_user_error(&e) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn change_status(
        ctx: poise::Context<'_, BotData, Error>,
        id: i64,
        status: ItemStatus,
    ) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        match recurring::set_item_status(&ctx.data().database, id, &user_id, status).await {
            Ok(item) => {
                ctx.say(format!("✅ **{}** is now {}.", item.name, item.status.as_str()))
                    .await?;
            }
            Err(e) if is_user_error(&e) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Stops charging an item until it is resumed.
    #[poise::command(slash_command, rename = "pause")]
    pub async fn recurring_pause(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Id of the recurring charge"] id: i64,
    ) -> Result<()> {
        change_status(ctx, id, ItemStatus::Paused).await
    }

    /// Starts charging a paused item again.
    ///
    /// Charges missed while paused are booked one per check, starting with the
    /// oldest, unless the next date is moved with `/recurring edit` first.
    #[poise::command(slash_command, rename = "resume")]
    pub async fn recurring_resume(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Id of the recurring charge"] id: i64,
    ) -> Result<()> {
        change_status(ctx, id, ItemStatus::Active).await
    }

    /// Stops charging an item for good.
    #[poise::command(slash_command, rename = "cancel")]
    pub async fn recurring_cancel(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Id of the recurring charge"] id: i64,
    ) -> Result<()> {
        change_status(ctx, id, ItemStatus::Cancelled).await
    }
}

// Re-export all commands
pub use inner::*;
