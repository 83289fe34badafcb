//! Telegram health publisher CLI
//!
//! Validates configuration and publishes one-off health reports. Long-running
//! schedulers embed the library instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use telegram_health_publisher::{
    error::{AppError, Result},
    models::{Config, HealthReport, HealthReportEntry, HealthStatus},
    publisher::{CancellationToken, DeliveryOutcome, TelegramPublisher},
    transport::RetryPolicy,
    utils::http,
};

/// Publish health-check reports to a Telegram chat
#[derive(Parser, Debug)]
#[command(name = "telegram-health", version, about = "Telegram health-check publisher")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "publisher.toml")]
    config: PathBuf,

    /// Override telegram.base_url
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override telegram.bot_token
    #[arg(long, global = true)]
    bot_token: Option<String>,

    /// Override telegram.chat_id
    #[arg(long, global = true, allow_negative_numbers = true)]
    chat_id: Option<i64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and exit
    Validate,

    /// Publish a single report
    Publish {
        /// JSON health report to publish; takes precedence over --status
        #[arg(long)]
        report: Option<PathBuf>,

        /// Overall status to publish (Healthy, Degraded, Unhealthy)
        #[arg(long, default_value = "Unhealthy")]
        status: String,

        /// Description attached to a single `cli` check
        #[arg(long)]
        description: Option<String>,
    },

    /// Show the effective target and delivery bounds
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load configuration, apply command-line overrides, then validate.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        log::warn!(
            "Config file {} not found, relying on command-line values",
            cli.config.display()
        );
        Config::default()
    };

    if let Some(base_url) = &cli.base_url {
        config.telegram.base_url = base_url.clone();
    }
    if let Some(bot_token) = &cli.bot_token {
        config.telegram.bot_token = bot_token.clone();
    }
    if let Some(chat_id) = cli.chat_id {
        config.telegram.chat_id = chat_id;
    }

    config.validate()?;
    Ok(config)
}

async fn read_report(path: &Path) -> Result<HealthReport> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
    };

    match &cli.command {
        Command::Validate => {
            log::info!("✓ Config OK (chat {})", config.telegram.chat_id);
        }

        Command::Info => {
            let policy = RetryPolicy::from_config(&config.resilience);
            log::info!("Base URL: {}", config.telegram.base_url);
            log::info!("Bot token: {}", config.telegram.redacted_token());
            log::info!("Chat: {}", config.telegram.chat_id);
            log::info!(
                "Policy: predicate={}, formatter={}",
                config.policy.predicate,
                config.policy.formatter
            );
            log::info!(
                "Delivery: {} attempts, {:?} per attempt, worst case {:?}",
                policy.max_attempts,
                policy.attempt_timeout,
                policy.worst_case_latency()
            );
        }

        Command::Publish {
            report,
            status,
            description,
        } => {
            let report = match report {
                Some(path) => read_report(path).await?,
                None => {
                    let mut entry = HealthReportEntry::new(HealthStatus::from_name(status));
                    if let Some(description) = description {
                        entry = entry.with_description(description.clone());
                    }
                    HealthReport::new(entry.status).with_entry("cli", entry)
                }
            };

            let client = http::create_async_client(&config.http)?;
            let publisher = TelegramPublisher::from_config(&config, client)?;

            let cancel = CancellationToken::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        log::warn!("Interrupted, cancelling delivery");
                        cancel.cancel();
                    }
                });
            }

            match publisher.publish_report(Arc::new(report), &cancel).await? {
                DeliveryOutcome::Delivered { .. } => log::info!("Report delivered"),
                DeliveryOutcome::Skipped => log::info!("Report skipped by predicate"),
                DeliveryOutcome::Rejected { status, reason } => {
                    return Err(AppError::Delivery { status, reason });
                }
                DeliveryOutcome::Failed { error } => return Err(AppError::transport(error)),
                DeliveryOutcome::Cancelled => return Err(AppError::Cancelled),
            }
        }
    }

    Ok(())
}
