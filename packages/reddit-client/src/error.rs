//! Error types for the Reddit client.

use thiserror::Error;

/// Result type for Reddit client operations.
pub type Result<T> = std::result::Result<T, RedditError>;

/// Reddit client errors.
#[derive(Debug, Error)]
pub enum RedditError {
    /// OAuth token exchange failed (bad credentials, app not authorized)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The requested thing, subreddit or user does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// API error (non-2xx response or a `json.errors` payload)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RedditError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RedditError::Parse(err.to_string())
        } else {
            RedditError::Network(err.to_string())
        }
    }
}
