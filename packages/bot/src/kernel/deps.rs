//! Bot dependencies for the watchers (using traits for testability)
//!
//! This module provides the dependency container shared by all watchers.
//! Reddit is reached through the `BasePlatform` trait so tests can swap in
//! `MockPlatform`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reddit_client::{RedditClient, RedditError, LINK_PREFIX};

use crate::config::BotSettings;
use crate::kernel::{
    BasePlatform, InboxItem, InboxItemKind, PlatformError, PlatformResult, Store, Submission,
};

/// Thing kind of private messages.
const MESSAGE_KIND: &str = "t4";

// =============================================================================
// RedditClient Adapter (implements BasePlatform trait)
// =============================================================================

/// Wrapper around RedditClient that implements BasePlatform trait
pub struct RedditAdapter {
    client: RedditClient,
    stream_poll_interval: Duration,
}

impl RedditAdapter {
    pub fn new(client: RedditClient, stream_poll_interval: Duration) -> Self {
        Self {
            client,
            stream_poll_interval,
        }
    }
}

impl From<RedditError> for PlatformError {
    fn from(err: RedditError) -> Self {
        match err {
            RedditError::NotFound(what) => PlatformError::NotFound(what),
            // Outages and rate limits are worth retrying, unlike a refusal
            RedditError::Api { status, message } if status == 429 || status >= 500 => {
                PlatformError::Transport(format!("HTTP {}: {}", status, message))
            }
            RedditError::Api { status, message } => PlatformError::Rejected { status, message },
            RedditError::Auth(message) => PlatformError::Rejected {
                status: 401,
                message,
            },
            RedditError::Network(message) => PlatformError::Transport(message),
            RedditError::Parse(message) => PlatformError::Malformed(message),
        }
    }
}

fn to_submission(raw: reddit_client::Submission) -> Submission {
    Submission {
        author: raw.author_name().map(str::to_string),
        id: raw.id,
        tag: raw.link_flair_text,
        title: raw.title,
        body: raw.selftext,
    }
}

fn to_inbox_item(raw: reddit_client::InboxItem) -> InboxItem {
    let kind = if raw.kind == MESSAGE_KIND && !raw.data.was_comment {
        InboxItemKind::Message
    } else {
        InboxItemKind::Other(raw.kind)
    };

    InboxItem {
        fullname: raw.data.name,
        kind,
        subject: raw.data.subject,
        author: raw.data.author,
    }
}

#[async_trait]
impl BasePlatform for RedditAdapter {
    fn submission_stream(&self, subreddit: &str) -> BoxStream<'static, PlatformResult<Submission>> {
        reddit_client::new_submissions(self.client.clone(), subreddit, self.stream_poll_interval)
            .map(|item| item.map(to_submission).map_err(PlatformError::from))
            .boxed()
    }

    async fn submission(&self, id: &str) -> PlatformResult<Submission> {
        Ok(to_submission(self.client.submission(id).await?))
    }

    async fn reply(&self, submission_id: &str, text: &str) -> PlatformResult<()> {
        let fullname = format!("{}{}", LINK_PREFIX, submission_id);
        Ok(self.client.reply(&fullname, text).await?)
    }

    async fn add_contributor(&self, subreddit: &str, username: &str) -> PlatformResult<()> {
        Ok(self.client.add_contributor(subreddit, username).await?)
    }

    async fn unread_inbox(&self) -> PlatformResult<Vec<InboxItem>> {
        let items = self.client.unread_messages().await?;
        Ok(items.into_iter().map(to_inbox_item).collect())
    }

    async fn mark_read(&self, item: &InboxItem) -> PlatformResult<()> {
        Ok(self.client.mark_read(&item.fullname).await?)
    }

    async fn accept_moderator_invite(&self, subreddit: &str) -> PlatformResult<()> {
        Ok(self.client.accept_moderator_invite(subreddit).await?)
    }

    async fn subreddit_exists(&self, name: &str) -> PlatformResult<bool> {
        Ok(self.client.subreddit_exists(name).await?)
    }

    async fn is_moderator_of(&self, subreddit: &str) -> PlatformResult<bool> {
        Ok(self.client.is_moderator(subreddit).await?)
    }
}

// =============================================================================
// BotDeps
// =============================================================================

/// Dependencies shared by every watcher
#[derive(Clone)]
pub struct BotDeps {
    pub store: Store,
    pub platform: Arc<dyn BasePlatform>,
    pub settings: BotSettings,
}

impl BotDeps {
    pub fn new(store: Store, platform: Arc<dyn BasePlatform>, settings: BotSettings) -> Self {
        Self {
            store,
            platform,
            settings,
        }
    }
}
