//! Startup checks that must pass before any watcher is launched.

use thiserror::Error;
use tracing::info;

use crate::kernel::{BasePlatform, PlatformError};

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("Subreddit name is blank")]
    BlankName,

    #[error("Subreddit does not exist: r/{0}")]
    MissingSubreddit(String),

    #[error("You must be a mod in this sub: r/{0}")]
    NotModerator(String),

    #[error("Could not verify r/{subreddit}: {source}")]
    Platform {
        subreddit: String,
        #[source]
        source: PlatformError,
    },
}

/// Verify the intake subreddit exists and the bot account moderates it.
pub async fn check_public_subreddit(
    platform: &dyn BasePlatform,
    subreddit: &str,
) -> Result<(), PreflightError> {
    let subreddit = subreddit.trim();
    if subreddit.is_empty() {
        return Err(PreflightError::BlankName);
    }

    let platform_error = |source: PlatformError| PreflightError::Platform {
        subreddit: subreddit.to_string(),
        source,
    };

    if !platform
        .subreddit_exists(subreddit)
        .await
        .map_err(platform_error)?
    {
        return Err(PreflightError::MissingSubreddit(subreddit.to_string()));
    }

    match platform.is_moderator_of(subreddit).await {
        Ok(true) => {}
        Ok(false) => return Err(PreflightError::NotModerator(subreddit.to_string())),
        Err(PlatformError::NotFound(_)) => {
            return Err(PreflightError::MissingSubreddit(subreddit.to_string()))
        }
        Err(e) => return Err(platform_error(e)),
    }

    info!(subreddit, "Public subreddit verified");
    Ok(())
}
