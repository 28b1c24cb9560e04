//! Access requests posted to the public subreddit.

pub mod models;
pub mod tag;
pub mod watcher;

pub use models::RequestPost;
pub use tag::WorkflowTag;
pub use watcher::RequestWatcher;
