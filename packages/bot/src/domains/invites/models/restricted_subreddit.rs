use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::kernel::{RecordSet, Store};

/// RestrictedSubreddit model - a subreddit whose contributors the bot manages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedSubreddit {
    pub name: String,
    pub added_at: DateTime<Utc>,
}

impl RestrictedSubreddit {
    /// Add `name` to the network. Returns `false` if already registered.
    pub async fn register(name: &str, store: &Store) -> Result<bool> {
        store
            .insert_if_absent(RecordSet::RestrictedSubreddits, name)
            .await
    }

    /// Names in registration order; grants are applied in this order
    pub async fn find_all_names(store: &Store) -> Result<Vec<String>> {
        store.list_all(RecordSet::RestrictedSubreddits).await
    }

    pub async fn find_all(store: &Store) -> Result<Vec<Self>> {
        let records = store.list_records(RecordSet::RestrictedSubreddits).await?;
        Ok(records
            .into_iter()
            .map(|r| Self {
                name: r.key,
                added_at: r.created_at,
            })
            .collect())
    }

    pub async fn remove(name: &str, store: &Store) -> Result<bool> {
        store.remove(RecordSet::RestrictedSubreddits, name).await
    }
}
