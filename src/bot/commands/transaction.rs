//! Transaction Discord commands - `expense`, `income` and `history`.
//!
//! Expenses go through the transaction service, so recording one can trigger
//! a budget alert in the alert channel.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{is_user_error, parse_date},
            handlers::autocomplete,
        },
        core::{report, stores::NewTransaction, transaction},
        entities::TransactionType,
        errors::{Error, Result},
    };
    use chrono::Utc;
    use std::fmt::Write;

    /// Most transactions `/history` will show.
    const MAX_HISTORY: u64 = 25;

    async fn record(
        ctx: poise::Context<'_, BotData, Error>,
        transaction_type: TransactionType,
        category: String,
        amount: f64,
        description: Option<String>,
        date: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();

        if let Err(e) = data.config.ensure_category(&category) {
            ctx.say(format!("❌ {e}")).await?;
            return Ok(());
        }
        let date = match date.as_deref().map(parse_date) {
            Some(None) => {
                ctx.say("❌ Invalid date: use the YYYY-MM-DD format.").await?;
                return Ok(());
            }
            Some(Some(d)) => d,
            None => Utc::now(),
        };
        let default_description = match transaction_type {
            TransactionType::Expense => "Expense",
            TransactionType::Income => "Income",
        };

        let new = NewTransaction {
            user_id: ctx.author().id.to_string(),
            transaction_type,
            category,
            amount,
            description: description.unwrap_or_else(|| default_description.to_string()),
            date,
            recurring_id: None,
            scheduled_for: None,
        };

        match data.transactions.record(new).await {
            Ok(created) => {
                let verb = match created.transaction_type {
                    TransactionType::Expense => "Spent",
                    TransactionType::Income => "Received",
                };
                ctx.say(format!(
                    "✅ {verb}: {} (Transaction ID: {})",
                    report::format_transaction_summary(&created, &data.config),
                    created.id
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

    /// Records an expense and checks the budgets covering it.
    #[poise::command(slash_command, prefix_command)]
    pub async fn expense(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category of the expense"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "Amount spent"] amount: f64,
        #[description = "Optional description of the expense"] description: Option<String>,
        #[description = "Optional date (YYYY-MM-DD), defaults to now"] date: Option<String>,
    ) -> Result<()> {
        record(ctx, TransactionType::Expense, category, amount, description, date).await
    }

    /// Records income.
    #[poise::command(slash_command, prefix_command)]
    pub async fn income(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category of the income"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "Amount received"] amount: f64,
        #[description = "Optional description of the income"] description: Option<String>,
        #[description = "Optional date (YYYY-MM-DD), defaults to now"] date: Option<String>,
    ) -> Result<()> {
        record(ctx, TransactionType::Income, category, amount, description, date).await
    }

    /// Shows your most recent transactions.
    #[poise::command(slash_command, prefix_command)]
    pub async fn history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many transactions to show (default 10, max 25)"] count: Option<u64>,
    ) -> Result<()> {
        let data = ctx.data();
        let limit = count.unwrap_or(10).clamp(1, MAX_HISTORY);
        let user_id = ctx.author().id.to_string();

        let recent = transaction::get_recent_transactions(&data.database, &user_id, limit).await?;
        if recent.is_empty() {
            ctx.say("No transactions recorded yet.").await?;
            return Ok(());
        }

        let mut response = String::from("**Recent Transactions:**\n");
        for txn in &recent {
            let _ = writeln!(
                response,
                "• {}",
                report::format_transaction_summary(txn, &data.config)
            );
        }
        ctx.say(response).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
