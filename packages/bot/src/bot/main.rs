// Main entry point for the network adder bot

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use network_adder::domains::approvals::ApprovalProcessor;
use network_adder::domains::invites::InviteProcessor;
use network_adder::domains::requests::RequestWatcher;
use network_adder::kernel::{check_public_subreddit, BotDeps, RedditAdapter, ServiceHost, Store};
use network_adder::Config;
use reddit_client::RedditClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize logging
    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,network_adder=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .with(file_layer)
        .init();

    tracing::info!("Starting Subreddit Network Adder");

    // Open the durable store
    tracing::info!(database_url = %config.database_url, "Opening database...");
    let store = Store::connect(&config.database_url)
        .await
        .context("Failed to open database")?;
    tracing::info!("Database ready");

    // Log in to Reddit
    let client = RedditClient::new(config.credentials()).context("Failed to build Reddit client")?;
    let platform = Arc::new(RedditAdapter::new(client, config.stream_poll_interval));

    if let Err(e) = check_public_subreddit(platform.as_ref(), &config.public_subreddit).await {
        tracing::error!(error = %e, "Startup check failed");
        return Err(e).context("Startup check failed");
    }

    let deps = BotDeps::new(store, platform, config.settings());

    ServiceHost::new()
        .with_service(RequestWatcher::new(deps.clone()))
        .with_service(ApprovalProcessor::new(deps.clone()))
        .with_service(InviteProcessor::new(deps))
        .run_until_shutdown()
        .await
}
