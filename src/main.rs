//! # Tide Bot Entry Point
//!
//! Wires the WorldTides client, the shared day cache and the dispatcher
//! together from `tide-config.toml`, then runs one command: an ad-hoc report,
//! the daily broadcast, or a single inbound message. Messages go to stdout
//! through the console transport; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tide_bot_lib::bot::TideBot;
use tide_bot_lib::cache::TideDataCache;
use tide_bot_lib::config::{Config, DEFAULT_CONFIG_PATH};
use tide_bot_lib::days::resolve_days;
use tide_bot_lib::directory::{InMemoryDirectory, RecipientDirectory, SubscriptionStore};
use tide_bot_lib::dispatcher::NotificationDispatcher;
use tide_bot_lib::renderer::ReportRenderer;
use tide_bot_lib::tide_data::{TideDataFetcher, TideSource, WorldTidesClient};
use tide_bot_lib::transport::{ConsoleTransport, MessageTransport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Address ad-hoc reports are printed for.
const CONSOLE_ADDRESS: &str = "console";

#[derive(Parser)]
#[command(name = "tide-bot")]
#[command(about = "Daily and on-demand tide extreme reports", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print tide reports for the given days (today, tomorrow, week, or dates)
    Tides { tokens: Vec<String> },
    /// Send today's notification to every enabled recipient
    Broadcast,
    /// Handle one inbound message as the bot would
    Message {
        /// Sender address
        #[arg(long)]
        from: String,
        /// Sender display name
        #[arg(long)]
        name: Option<String>,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Write the default configuration file
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::InitConfig = cli.command {
        Config::default()
            .save_to_path(&cli.config)
            .with_context(|| format!("failed to write {}", cli.config.display()))?;
        println!("Wrote default configuration to {}.", cli.config.display());
        return Ok(());
    }

    let config = Config::load_from_path(&cli.config);
    if config.api.key.is_empty() {
        warn!("no WorldTides API key configured; requests will be rejected upstream");
    }

    let client = WorldTidesClient::new(
        config.api.base_url.clone(),
        config.api.key.clone(),
        config.request_timeout(),
    )
    .context("failed to build HTTP client")?;
    let fetcher = Arc::new(TideDataFetcher::new(
        Arc::new(client) as Arc<dyn TideSource>,
        Arc::new(TideDataCache::new()),
        config.coordinate(),
        config.location.datum.clone(),
    ));

    let directory = Arc::new(InMemoryDirectory::from_entries(&config.recipients));
    let transport: Arc<dyn MessageTransport> = Arc::new(ConsoleTransport::new());
    let renderer = ReportRenderer::new(config.display_timezone(), config.location.name.clone());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        fetcher,
        Arc::clone(&directory) as Arc<dyn RecipientDirectory>,
        Arc::clone(&transport),
        renderer,
        config.messaging.delivery,
        config.messaging.daily_template_id.clone(),
    ));

    let today = config.today();

    match cli.command {
        Commands::Tides { tokens } => {
            let days = resolve_days(tokens.as_slice(), today);
            let summary = dispatcher.dispatch_ad_hoc(CONSOLE_ADDRESS, &days).await;
            info!(
                requested = tokens.len(),
                sent = summary.succeeded,
                failed = summary.failed,
                "tides command finished"
            );
        }
        Commands::Broadcast => {
            let sent = dispatcher
                .dispatch_scheduled(today)
                .await
                .context("daily broadcast failed")?;
            info!(sent, "daily broadcast finished");
        }
        Commands::Message { from, name, text } => {
            let bot = TideBot::new(
                dispatcher,
                directory as Arc<dyn SubscriptionStore>,
                transport,
                config.location.name.clone(),
            );
            let body = text.join(" ");
            let summary = bot
                .handle_message(&body, &from, name.as_deref(), today)
                .await;
            if !summary.is_clean() {
                warn!(failed = summary.failed, "some replies could not be delivered");
            }
        }
        Commands::InitConfig => {}
    }

    Ok(())
}
