//! Invite processor: joins new subreddits to the network.
//!
//! ```text
//! unread inbox
//!     │
//!     ├─► not a private message / not an invite ──► skip (left unread)
//!     └─► accept invite ──rejected──► skip (left unread)
//!             │
//!             ▼
//!         RestrictedSubreddit::register ─► mark read ─► back-fill approved users
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::models::RestrictedSubreddit;
use super::subject::invited_subreddit;
use crate::domains::approvals::ApprovedUser;
use crate::kernel::{sleep_or_shutdown, BotDeps, InboxItem, PlatformError, Service};

/// Result of granting every approved user on a newly joined subreddit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backfill {
    pub granted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InviteCycle {
    pub unread: usize,
    pub accepted: Vec<String>,
    pub skipped: usize,
}

pub struct InviteProcessor {
    deps: BotDeps,
}

impl InviteProcessor {
    pub fn new(deps: BotDeps) -> Self {
        Self { deps }
    }

    /// Handle every unread moderation invite once.
    pub async fn run_cycle(&self) -> Result<InviteCycle> {
        let items = self
            .deps
            .platform
            .unread_inbox()
            .await
            .context("Failed to list unread inbox")?;

        let mut cycle = InviteCycle {
            unread: items.len(),
            ..Default::default()
        };

        for item in &items {
            if !item.is_message() {
                continue;
            }
            let Some(subreddit) = invited_subreddit(&item.subject) else {
                continue;
            };

            if self.accept(item, &subreddit).await? {
                cycle.accepted.push(subreddit);
            } else {
                cycle.skipped += 1;
            }
        }

        Ok(cycle)
    }

    /// Accept one invite, register the subreddit and back-fill it.
    /// Returns `false` when the invite could not be accepted.
    async fn accept(&self, item: &InboxItem, subreddit: &str) -> Result<bool> {
        let platform = &self.deps.platform;

        match platform.accept_moderator_invite(subreddit).await {
            Ok(()) => {}
            Err(e @ (PlatformError::Rejected { .. } | PlatformError::NotFound(_))) => {
                debug!(
                    subreddit,
                    message = %item.fullname,
                    error = %e,
                    "Invite already accepted or expired; skipping"
                );
                return Ok(false);
            }
            Err(e) => {
                warn!(subreddit, error = %e, "Could not accept moderator invite");
                return Ok(false);
            }
        }

        info!(
            subreddit,
            invited_by = item.author.as_deref().unwrap_or("[unknown]"),
            "Accepted moderator invite"
        );

        RestrictedSubreddit::register(subreddit, &self.deps.store)
            .await
            .with_context(|| format!("Failed to register restricted subreddit {}", subreddit))?;

        if let Err(e) = platform.mark_read(item).await {
            warn!(message = %item.fullname, error = %e, "Could not mark invite as read");
        }

        let backfill = self.backfill(subreddit).await?;
        info!(
            subreddit,
            granted = backfill.granted,
            failed = backfill.failed,
            "Added approved users to new subreddit"
        );

        Ok(true)
    }

    /// Grant every approved user on `subreddit`, pausing between grants.
    /// A failed grant is logged and the next user is tried.
    pub async fn backfill(&self, subreddit: &str) -> Result<Backfill> {
        let usernames = ApprovedUser::find_all_usernames(&self.deps.store)
            .await
            .context("Failed to load approved users")?;

        let mut backfill = Backfill::default();
        for (i, username) in usernames.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.deps.settings.grant_pause).await;
            }

            match self.deps.platform.add_contributor(subreddit, username).await {
                Ok(()) => {
                    debug!(subreddit, username = %username, "Contributor added");
                    backfill.granted += 1;
                }
                Err(e) => {
                    warn!(subreddit, username = %username, error = %e, "Back-fill grant failed");
                    backfill.failed += 1;
                }
            }
        }

        Ok(backfill)
    }
}

#[async_trait]
impl Service for InviteProcessor {
    fn name(&self) -> &'static str {
        "invite-processor"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        info!(
            interval_secs = self.deps.settings.invite_interval.as_secs(),
            "Checking for moderator invites"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.run_cycle() => match result {
                    Ok(cycle) if !cycle.accepted.is_empty() => info!(?cycle, "Invite cycle complete"),
                    Ok(cycle) => debug!(?cycle, "Invite cycle complete"),
                    Err(e) => error!(error = ?e, "Invite cycle failed"),
                },
            }

            if !sleep_or_shutdown(self.deps.settings.invite_interval, &shutdown).await {
                break;
            }
        }

        info!("invite processor stopped");
        Ok(())
    }
}
