// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no workflow logic.
// The watchers in domains/ decide what to do; these traits only talk to Reddit.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

// =============================================================================
// Platform errors
// =============================================================================

/// Failure kinds the watchers distinguish.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The post, subreddit or user vanished between discovery and use
    #[error("not found: {0}")]
    NotFound(String),

    /// Reddit refused the action (expired invite, missing permission)
    #[error("rejected by platform ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The connection failed; the call may succeed if retried
    #[error("transport error: {0}")]
    Transport(String),

    /// Reddit answered with something we could not interpret
    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

// =============================================================================
// Platform data
// =============================================================================

/// The slice of a submission the workflow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    /// `None` once the author's account is deleted
    pub author: Option<String>,
    /// Link flair text, the moderator-controlled workflow signal
    pub tag: Option<String>,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxItemKind {
    /// A private message (`t4`)
    Message,
    /// Comment replies, username mentions and anything else
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxItem {
    /// Fullname used to mark the item read, e.g. `t4_abc`
    pub fullname: String,
    pub kind: InboxItemKind,
    pub subject: String,
    pub author: Option<String>,
}

impl InboxItem {
    pub fn is_message(&self) -> bool {
        self.kind == InboxItemKind::Message
    }
}

// =============================================================================
// Platform Gateway Trait (Infrastructure - Reddit)
// =============================================================================

#[async_trait]
pub trait BasePlatform: Send + Sync {
    /// Live, endless stream of new submissions in `subreddit`.
    ///
    /// Each call opens a fresh subscription; callers resubscribe after a
    /// `Transport` error or when the stream ends.
    fn submission_stream(&self, subreddit: &str) -> BoxStream<'static, PlatformResult<Submission>>;

    /// Fetch the current state of a submission by id
    async fn submission(&self, id: &str) -> PlatformResult<Submission>;

    /// Comment on a submission
    async fn reply(&self, submission_id: &str, text: &str) -> PlatformResult<()>;

    /// Add a user to a subreddit's contributor list. Re-adding is a no-op.
    async fn add_contributor(&self, subreddit: &str, username: &str) -> PlatformResult<()>;

    /// All unread inbox items
    async fn unread_inbox(&self) -> PlatformResult<Vec<InboxItem>>;

    async fn mark_read(&self, item: &InboxItem) -> PlatformResult<()>;

    async fn accept_moderator_invite(&self, subreddit: &str) -> PlatformResult<()>;

    async fn subreddit_exists(&self, name: &str) -> PlatformResult<bool>;

    /// Whether the bot account moderates `subreddit`
    async fn is_moderator_of(&self, subreddit: &str) -> PlatformResult<bool>;
}
