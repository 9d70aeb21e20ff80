//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the BudgetBuddy application,
//! including all slash commands, autocomplete handlers, the alert channel sink
//! and bot context management.

/// Discord channel sink for budget alerts and charge notifications
pub mod alerts;
/// Discord command implementations (recurring, budget, transaction, schedule, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    config::AppConfig,
    core::{
        notifications::{LogSink, Notifications},
        notifier::BudgetNotifier,
        report,
        scanner::DueItemScanner,
        stores::SeaOrmStore,
        transaction::TransactionService,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Shared data available to all bot commands.
/// This structure holds the database connection, the loaded configuration and
/// the services built on top of them.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Records transactions and runs budget alerts
    pub transactions: TransactionService,
    /// Books due recurring charges
    pub scanner: DueItemScanner,
}

impl BotData {
    /// Wires the services over one database connection.
    ///
    /// Every notification goes to the log; `notifications` may add further
    /// sinks such as the Discord alert channel.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        config: Arc<AppConfig>,
        notifications: Notifications,
    ) -> Self {
        let store = Arc::new(SeaOrmStore::new(database.clone()));
        let notifications = notifications.with_sink(Arc::new(LogSink));
        let notifier = BudgetNotifier::new(
            Arc::<SeaOrmStore>::clone(&store),
            Arc::<SeaOrmStore>::clone(&store),
            Arc::<SeaOrmStore>::clone(&store),
            notifications.clone(),
            Arc::clone(&config),
        );
        let transactions = TransactionService::new(Arc::<SeaOrmStore>::clone(&store), notifier);
        let scanner = DueItemScanner::new(
            store,
            transactions.clone(),
            notifications,
            Arc::clone(&config),
        );
        Self {
            database,
            config,
            transactions,
            scanner,
        }
    }
}

/// Poise context used by every command.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("❌ An error occurred: {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Builds the notification fan-out for a connected bot.
fn discord_notifications(http: Arc<serenity::Http>, config: &AppConfig) -> Notifications {
    let notifications = Notifications::new(config.scheduler.call_timeout());
    match config.alerts.channel_id {
        Some(channel_id) => {
            info!("Sending alerts to Discord channel {channel_id}");
            notifications.with_sink(Arc::new(alerts::DiscordChannelSink::new(http, channel_id)))
        }
        None => notifications,
    }
}

/// Connects to Discord and runs until the client stops.
///
/// Runs one scan right after login.
#[instrument(skip(token, config, database))]
pub async fn run_bot(
    token: String,
    config: Arc<AppConfig>,
    database: DatabaseConnection,
) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::check_due(),
                commands::upcoming(),
                commands::recurring(),
                commands::budget(),
                commands::expense(),
                commands::income(),
                commands::history(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let notifications = discord_notifications(Arc::clone(&ctx.http), &config);
                let data = BotData::new(database, config, notifications);

                match data.scanner.scan(Utc::now()).await {
                    Ok(Some(outcome)) => info!("{}", report::format_scan_summary(&outcome)),
                    Ok(None) => {}
                    Err(e) => warn!("Startup scan failed: {}", e),
                }
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}
