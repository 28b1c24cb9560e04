//! Request watcher: records every "request"-flaired post in the public subreddit.
//!
//! ```text
//! submission_stream(public)
//!     │
//!     ├─► flair != "request" ──► skip
//!     └─► RequestPost::track(id)   (no-op if already tracked)
//! ```
//!
//! The stream is resubscribed after transport failures. Any other platform
//! error, or a storage fault, ends the watcher.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::models::RequestPost;
use super::tag::WorkflowTag;
use crate::kernel::{sleep_or_shutdown, BotDeps, PlatformError, Service, Submission};

pub struct RequestWatcher {
    deps: BotDeps,
}

impl RequestWatcher {
    pub fn new(deps: BotDeps) -> Self {
        Self { deps }
    }

    /// Track `submission` if it is a request. Returns whether it was newly tracked.
    pub async fn observe(&self, submission: &Submission) -> Result<bool> {
        if !WorkflowTag::parse(submission.tag.as_deref()).is_request() {
            return Ok(false);
        }

        // Every resubscribe replays the front page; skip the write lock for those
        if RequestPost::is_tracked(&submission.id, &self.deps.store).await? {
            debug!(post_id = %submission.id, "Request post already tracked");
            return Ok(false);
        }

        let tracked = RequestPost::track(&submission.id, &self.deps.store)
            .await
            .with_context(|| format!("Failed to record request post {}", submission.id))?;

        if tracked {
            info!(
                post_id = %submission.id,
                author = submission.author.as_deref().unwrap_or("[deleted]"),
                "New request post found"
            );
        } else {
            debug!(post_id = %submission.id, "Request post already tracked");
        }

        Ok(tracked)
    }
}

#[async_trait]
impl Service for RequestWatcher {
    fn name(&self) -> &'static str {
        "request-watcher"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        let subreddit = self.deps.settings.public_subreddit.clone();
        info!(subreddit = %subreddit, "Checking for request posts");

        loop {
            let mut stream = self.deps.platform.submission_stream(&subreddit);

            loop {
                let next = tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("request watcher stopped");
                        return Ok(());
                    }
                    next = stream.next() => next,
                };

                match next {
                    Some(Ok(submission)) => {
                        self.observe(&submission).await?;
                    }
                    Some(Err(PlatformError::NotFound(what))) => {
                        debug!(what = %what, "Submission vanished before it could be read");
                    }
                    Some(Err(PlatformError::Transport(e))) => {
                        warn!(error = %e, "Submission stream disconnected; resubscribing");
                        break;
                    }
                    Some(Err(e)) => {
                        return Err(e).context("Submission stream failed");
                    }
                    None => {
                        warn!("Submission stream ended; resubscribing");
                        break;
                    }
                }
            }

            if !sleep_or_shutdown(self.deps.settings.resubscribe_delay, &shutdown).await {
                info!("request watcher stopped");
                return Ok(());
            }
        }
    }
}
