//! Approval processor: turns moderator-approved requests into contributor grants.
//!
//! Every cycle re-reads the pending set and walks each post through:
//!
//! ```text
//! pending ──flair approved/complete──► resolving ──all grants ok──► resolved
//!    ▲                                     │
//!    └──────────── grant failed ───────────┘   (whole loop retried next cycle)
//! ```
//!
//! Resolution order is grants, then `ApprovedUser::approve`, then
//! `RequestPost::retire`, then the reply. A crash anywhere before the retire
//! leaves the post pending, and re-granting on the next cycle is harmless
//! because Reddit ignores duplicate contributor adds.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::models::ApprovedUser;
use crate::domains::invites::models::RestrictedSubreddit;
use crate::domains::requests::{RequestPost, WorkflowTag};
use crate::kernel::{sleep_or_shutdown, BotDeps, PlatformError, Service};

pub const APPROVAL_REPLY: &str = "Your request has been approved by the mods. \
You have been added to the restricted subreddits.";

/// Outcome of one resolution attempt for a pending post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No approval flair yet
    Pending,
    /// The post or its author is gone; the post stays tracked
    Abandoned,
    /// Something transient got in the way; retried next cycle
    Deferred { reason: String },
    /// Granted everywhere, recorded as approved, and retired
    Resolved { author: String },
}

/// Tally of one pass over the pending set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalCycle {
    pub scanned: usize,
    pub resolved: usize,
    pub deferred: usize,
    pub abandoned: usize,
}

/// Post ids already reported, so a stuck post is warned about once.
#[derive(Default)]
struct ReportedPosts(Mutex<HashSet<String>>);

impl ReportedPosts {
    fn first_sighting(&self, post_id: &str) -> bool {
        self.0
            .lock()
            .map(|mut seen| seen.insert(post_id.to_string()))
            .unwrap_or(false)
    }
}

pub struct ApprovalProcessor {
    deps: BotDeps,
    authorless: ReportedPosts,
}

impl ApprovalProcessor {
    pub fn new(deps: BotDeps) -> Self {
        Self {
            deps,
            authorless: ReportedPosts::default(),
        }
    }

    /// Re-check every pending request once.
    pub async fn run_cycle(&self) -> Result<ApprovalCycle> {
        let post_ids = RequestPost::find_all_ids(&self.deps.store)
            .await
            .context("Failed to load pending request posts")?;

        let mut cycle = ApprovalCycle {
            scanned: post_ids.len(),
            ..Default::default()
        };

        for post_id in &post_ids {
            match self.resolve(post_id).await? {
                Resolution::Pending => {}
                Resolution::Abandoned => cycle.abandoned += 1,
                Resolution::Deferred { .. } => cycle.deferred += 1,
                Resolution::Resolved { .. } => cycle.resolved += 1,
            }
        }

        Ok(cycle)
    }

    /// Drive one pending post as far through the workflow as it can go.
    pub async fn resolve(&self, post_id: &str) -> Result<Resolution> {
        let platform = &self.deps.platform;
        let store = &self.deps.store;

        let submission = match platform.submission(post_id).await {
            Ok(submission) => submission,
            Err(PlatformError::NotFound(_)) => {
                debug!(post_id, "Request post no longer exists");
                return Ok(Resolution::Abandoned);
            }
            Err(e) => {
                warn!(post_id, error = %e, "Could not fetch request post");
                return Ok(Resolution::Deferred {
                    reason: e.to_string(),
                });
            }
        };

        if !WorkflowTag::parse(submission.tag.as_deref()).grants_access() {
            return Ok(Resolution::Pending);
        }

        let Some(author) = submission.author else {
            if self.authorless.first_sighting(post_id) {
                warn!(
                    post_id,
                    "Approved request has no author (account deleted); \
                     drop it with `store_cli remove-pending`"
                );
            } else {
                debug!(post_id, "Approved request still has no author");
            }
            return Ok(Resolution::Abandoned);
        };

        info!(post_id, author = %author, "Adding user to restricted subreddits");
        if let Some(reason) = self.grant_everywhere(&author).await? {
            return Ok(Resolution::Deferred { reason });
        }

        ApprovedUser::approve(&author, store)
            .await
            .with_context(|| format!("Failed to record {} as approved", author))?;
        RequestPost::retire(post_id, store)
            .await
            .with_context(|| format!("Failed to retire request post {}", post_id))?;

        if let Err(e) = platform.reply(post_id, APPROVAL_REPLY).await {
            warn!(post_id, error = %e, "Could not reply to approved request");
        }

        info!(post_id, author = %author, "Successfully added user to restricted subreddits");
        Ok(Resolution::Resolved { author })
    }

    /// Grant `username` on every restricted subreddit in registration order,
    /// pausing between grants. Returns the failure that stopped the loop.
    async fn grant_everywhere(&self, username: &str) -> Result<Option<String>> {
        let subreddits = RestrictedSubreddit::find_all_names(&self.deps.store)
            .await
            .context("Failed to load restricted subreddits")?;

        for (i, subreddit) in subreddits.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.deps.settings.grant_pause).await;
            }

            match self.deps.platform.add_contributor(subreddit, username).await {
                Ok(()) => debug!(subreddit = %subreddit, username, "Contributor added"),
                Err(PlatformError::NotFound(_)) => {
                    warn!(subreddit = %subreddit, "Restricted subreddit no longer exists; skipping");
                }
                Err(e) => {
                    warn!(
                        subreddit = %subreddit,
                        username,
                        error = %e,
                        "Contributor grant failed; request stays pending"
                    );
                    return Ok(Some(format!("r/{}: {}", subreddit, e)));
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl Service for ApprovalProcessor {
    fn name(&self) -> &'static str {
        "approval-processor"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        info!(
            interval_secs = self.deps.settings.approval_interval.as_secs(),
            "Checking for users to approve"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.run_cycle() => match result {
                    Ok(cycle) if cycle.resolved + cycle.deferred > 0 => info!(?cycle, "Approval cycle complete"),
                    Ok(cycle) => debug!(?cycle, "Approval cycle complete"),
                    Err(e) => error!(error = ?e, "Approval cycle failed"),
                },
            }

            if !sleep_or_shutdown(self.deps.settings.approval_interval, &shutdown).await {
                break;
            }
        }

        info!("approval processor stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuck_posts_are_reported_once() {
        let reported = ReportedPosts::default();

        assert!(reported.first_sighting("p1"));
        assert!(!reported.first_sighting("p1"));
        assert!(reported.first_sighting("p2"));
    }
}
