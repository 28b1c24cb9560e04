//! CLI for inspecting and editing the bot database by hand
//!
//! Every command prints JSON lines so the output can be piped into `jq`.

use std::env;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use network_adder::domains::approvals::ApprovedUser;
use network_adder::domains::invites::RestrictedSubreddit;
use network_adder::domains::requests::RequestPost;
use network_adder::kernel::{RecordSet, Store};
use network_adder::DEFAULT_DATABASE_URL;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "store_cli")]
#[command(about = "Inspect and edit the network adder database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List one record set: pending, restricted or approved
    List { set: String },

    /// Register a restricted subreddit without an invite (no back-fill)
    AddRestricted { name: String },

    /// Stop managing a restricted subreddit
    RemoveRestricted { name: String },

    /// Forget an approved user (existing grants are left alone)
    RemoveApproved { username: String },

    /// Stop tracking a request post
    RemovePending { post_id: String },
}

// ============================================================================
// JSON Response Types
// ============================================================================

#[derive(Serialize)]
struct RecordLine<'a> {
    set: &'a str,
    key: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct Response<'a> {
    success: bool,
    set: &'a str,
    key: &'a str,
    /// Whether the command changed anything
    changed: bool,
}

fn output<T: Serialize>(line: &T) -> Result<()> {
    println!("{}", serde_json::to_string(line)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = open_store().await?;

    match cli.command {
        Commands::List { set } => cmd_list(&store, set.parse()?).await,
        Commands::AddRestricted { name } => {
            let changed = RestrictedSubreddit::register(&name, &store).await?;
            respond(RecordSet::RestrictedSubreddits, &name, changed)
        }
        Commands::RemoveRestricted { name } => {
            let changed = RestrictedSubreddit::remove(&name, &store).await?;
            respond(RecordSet::RestrictedSubreddits, &name, changed)
        }
        Commands::RemoveApproved { username } => {
            let changed = ApprovedUser::revoke(&username, &store).await?;
            respond(RecordSet::ApprovedUsers, &username, changed)
        }
        Commands::RemovePending { post_id } => {
            let changed = RequestPost::retire(&post_id, &store).await?;
            respond(RecordSet::PendingRequests, &post_id, changed)
        }
    }
}

async fn open_store() -> Result<Store> {
    let _ = dotenvy::dotenv();
    let url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    Store::connect(&url)
        .await
        .with_context(|| format!("Failed to open database {}", url))
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_list(store: &Store, set: RecordSet) -> Result<()> {
    let records: Vec<(String, DateTime<Utc>)> = match set {
        RecordSet::PendingRequests => RequestPost::find_all(store)
            .await?
            .into_iter()
            .map(|p| (p.post_id, p.discovered_at))
            .collect(),
        RecordSet::RestrictedSubreddits => RestrictedSubreddit::find_all(store)
            .await?
            .into_iter()
            .map(|s| (s.name, s.added_at))
            .collect(),
        RecordSet::ApprovedUsers => ApprovedUser::find_all(store)
            .await?
            .into_iter()
            .map(|u| (u.username, u.approved_at))
            .collect(),
    };

    for (key, created_at) in records {
        output(&RecordLine {
            set: set.label(),
            key,
            created_at,
        })?;
    }

    Ok(())
}

fn respond(set: RecordSet, key: &str, changed: bool) -> Result<()> {
    output(&Response {
        success: true,
        set: set.label(),
        key,
        changed,
    })
}
