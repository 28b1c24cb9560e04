use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use reddit_client::Credentials;

const DEFAULT_USER_AGENT: &str = "Subreddit Network Adder v1.0";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://bot_database.db";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub public_subreddit: String,
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_username: String,
    pub reddit_password: String,
    pub reddit_user_agent: String,
    pub database_url: String,
    pub approval_interval: Duration,
    pub invite_interval: Duration,
    pub grant_pause: Duration,
    pub stream_poll_interval: Duration,
    pub resubscribe_delay: Duration,
    /// Also append logs to this file when set
    pub log_file: Option<PathBuf>,
}

/// Timing and targeting knobs shared by the watchers.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// The intake subreddit where access requests are posted
    pub public_subreddit: String,
    /// Pause between pending-request rescans
    pub approval_interval: Duration,
    /// Pause between inbox scans
    pub invite_interval: Duration,
    /// Pause between consecutive contributor grants (Reddit rate limits)
    pub grant_pause: Duration,
    /// Wait before resubscribing after the submission stream drops
    pub resubscribe_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };
        let seconds = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => u64::from_str(raw.trim())
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a whole number of seconds", key)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let public_subreddit = normalize_subreddit(&required("PUBLIC_SUBREDDIT")?);
        if public_subreddit.is_empty() {
            bail!("PUBLIC_SUBREDDIT must name a subreddit");
        }

        Ok(Self {
            public_subreddit,
            reddit_client_id: required("REDDIT_CLIENT_ID")?,
            reddit_client_secret: required("REDDIT_CLIENT_SECRET")?,
            reddit_username: required("REDDIT_USERNAME")?,
            reddit_password: required("REDDIT_PASSWORD")?,
            reddit_user_agent: lookup("REDDIT_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            approval_interval: seconds("APPROVAL_INTERVAL_SECS", 120)?,
            invite_interval: seconds("INVITE_INTERVAL_SECS", 120)?,
            grant_pause: seconds("GRANT_PAUSE_SECS", 2)?,
            stream_poll_interval: seconds("STREAM_POLL_SECS", 5)?,
            resubscribe_delay: seconds("RESUBSCRIBE_DELAY_SECS", 30)?,
            log_file: lookup("LOG_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.reddit_client_id.clone(),
            client_secret: self.reddit_client_secret.clone(),
            username: self.reddit_username.clone(),
            password: self.reddit_password.clone(),
            user_agent: self.reddit_user_agent.clone(),
        }
    }

    pub fn settings(&self) -> BotSettings {
        BotSettings {
            public_subreddit: self.public_subreddit.clone(),
            approval_interval: self.approval_interval,
            invite_interval: self.invite_interval,
            grant_pause: self.grant_pause,
            resubscribe_delay: self.resubscribe_delay,
        }
    }
}

/// Accept `foo`, `r/foo` and `/r/foo`.
fn normalize_subreddit(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('/');
    trimmed
        .strip_prefix("r/")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}
