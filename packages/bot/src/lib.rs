// Subreddit Network Adder - bot core
//
// Grants approved members contributor access across a network of restricted
// subreddits. Three long-running watchers share one durable store:
// requests (intake posts), approvals (moderator sign-off) and invites
// (new subreddits joining the network).
//
// Each watcher lives in domains/*/ and talks to Reddit only through
// kernel::BasePlatform.

pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
