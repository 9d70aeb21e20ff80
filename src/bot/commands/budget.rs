//! Budget Discord commands - `/budget` and its subcommands.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::is_user_error, handlers::autocomplete},
        core::{
            budget::{self, NewBudget},
            report,
        },
        entities::BudgetPeriod,
        errors::{Error, Result},
    };
    use chrono::{Datelike, Utc};
    use std::fmt::Write;

    /// Parent command for managing category budgets.
    #[poise::command(
        slash_command,
        subcommands(
            "budget_add",
            "budget_list",
            "budget_enable",
            "budget_disable",
            "budget_delete"
        )
    )]
    pub async fn budget(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Budget management command. Available subcommands:\n\
            `/budget add` - Set a monthly or yearly limit for a category\n\
            `/budget list` - Show your budgets and how much is used\n\
            `/budget enable` - Turn a budget's alerts back on\n\
            `/budget disable` - Turn a budget's alerts off\n\
            `/budget delete` - Remove a budget";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Sets a spending limit for a category.
    ///
    /// Without options the budget covers the current month. Pass `yearly` for a
    /// budget covering a whole year.
    #[poise::command(slash_command, rename = "add")]
    pub async fn budget_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category to limit"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "Spending limit"] amount: f64,
        #[description = "Cover a whole year instead of one month"] yearly: Option<bool>,
        #[description = "Year (defaults to the current year)"] year: Option<i32>,
        #[description = "Month 1-12 (defaults to the current month)"]
        #[min = 1]
        #[max = 12]
        month: Option<u32>,
    ) -> Result<()> {
        let today = Utc::now();
        let year = year.unwrap_or_else(|| today.year());
        let (period, month) = if yearly.unwrap_or(false) {
            (BudgetPeriod::Yearly, None)
        } else {
            (BudgetPeriod::Monthly, Some(month.unwrap_or_else(|| today.month())))
        };

        let data = ctx.data();
        let new = NewBudget {
            user_id: ctx.author().id.to_string(),
            category_id: category,
            amount,
            period,
            year,
            month,
        };

        match budget::create_budget(&data.database, &data.config, new).await {
            Ok(created) => {
                ctx.say(format!(
                    "✅ Budget #{} set: ${:.2} for {} ({}).",
                    created.id,
                    created.amount,
                    data.config.category_name(&created.category_id),
                    budget::scope_label(created.period, created.year, created.month)
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

    /// Lists your budgets with their current usage.
    #[poise::command(slash_command, rename = "list")]
    pub async fn budget_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();
        let budgets = budget::get_budgets_for_user(&data.database, &user_id).await?;

        if budgets.is_empty() {
            ctx.say("💰 No budgets yet. Create one with `/budget add`.")
                .await?;
            return Ok(());
        }

        let mut message = String::from("💰 **Your budgets**\n");
        for b in budgets {
            let usage = budget::get_budget_usage(&data.database, b).await?;
            let _ = writeln!(message, "{}\n", report::format_budget_usage(&usage, &data.config));
        }
        ctx.say(message).await?;
        Ok(())
    }

    async fn toggle(ctx: poise::Context<'_, BotData, Error>, id: i64, enabled: bool) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        match budget::set_budget_enabled(&ctx.data().database, id, &user_id, enabled).await {
            Ok(updated) => {
                let state = if updated.enabled { "enabled" } else { "disabled" };
                ctx.say(format!("✅ Budget #{} is now {state}.", updated.id))
                    .await?;
            }
            Err(e) if is_user_error(&e) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Turns a budget's alerts back on.
    #[poise::command(slash_command, rename = "enable")]
    pub async fn budget_enable(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Id of the budget"] id: i64,
    ) -> Result<()> {
        toggle(ctx, id, true).await
    }

    /// Turns a budget's alerts off without deleting it.
    #[poise::command(slash_command, rename = "disable")]
    pub async fn budget_disable(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Id of the budget"] id: i64,
    ) -> Result<()> {
        toggle(ctx, id, false).await
    }

    /// Deletes a budget and its alert history.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn budget_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Id of the budget"] id: i64,
    ) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        match budget::delete_budget(&ctx.data().database, id, &user_id).await {
            Ok(()) => {
                ctx.say(format!("🗑️ Budget #{id} deleted.")).await?;
            }
            Err(e) if is_user_error(&e) => {
                ctx.say(format!("❌ {e}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
