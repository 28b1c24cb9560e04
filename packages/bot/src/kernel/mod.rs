//! Kernel module - bot infrastructure and dependencies.

pub mod deps;
pub mod preflight;
pub mod service_host;
pub mod store;
pub mod test_dependencies;
pub mod traits;

pub use deps::{BotDeps, RedditAdapter};
pub use preflight::{check_public_subreddit, PreflightError};
pub use service_host::{sleep_or_shutdown, Service, ServiceHost};
pub use store::{RecordSet, Store, StoredRecord};
pub use test_dependencies::{mock_submission, MockPlatform};
pub use traits::*;
