//! Moderator invites: how new subreddits join the network.

pub mod models;
pub mod processor;
pub mod subject;

pub use models::RestrictedSubreddit;
pub use processor::{Backfill, InviteCycle, InviteProcessor};
pub use subject::invited_subreddit;
