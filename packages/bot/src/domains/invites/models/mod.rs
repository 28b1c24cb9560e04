pub mod restricted_subreddit;

pub use restricted_subreddit::RestrictedSubreddit;
