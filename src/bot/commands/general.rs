//! General Discord commands - ping and help.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**BudgetBuddy Help**\n\
        Here is a summary of all available commands for BudgetBuddy.\n\n\
        **Transactions**\n\
        • `/expense <category> <amount> [desc] [date]` - Records an expense and checks your budgets.\n\
        • `/income <category> <amount> [desc] [date]` - Records income.\n\
        • `/history [count]` - Shows your latest transactions.\n\n\
        **Recurring Charges**\n\
        • `/recurring add|list|edit|pause|resume|cancel` - Manage subscriptions and other repeating expenses.\n\
        • `/upcoming [days]` - Shows charges coming up.\n\
        • `/check_due` - Books every charge that is due now.\n\n\
        **Budgets**\n\
        • `/budget add|list|enable|disable|delete` - Manage monthly and yearly category budgets.\n\
        Alerts are sent at 80%, 90% and 100% of a budget.\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
