use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::kernel::{RecordSet, Store};

/// ApprovedUser model - a member granted access to the restricted network
///
/// Back-fill reads this set whenever a new restricted subreddit joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedUser {
    pub username: String,
    pub approved_at: DateTime<Utc>,
}

impl ApprovedUser {
    /// Record `username` as approved. Returns `false` if already approved.
    pub async fn approve(username: &str, store: &Store) -> Result<bool> {
        store.insert_if_absent(RecordSet::ApprovedUsers, username).await
    }

    /// Usernames in approval order
    pub async fn find_all_usernames(store: &Store) -> Result<Vec<String>> {
        store.list_all(RecordSet::ApprovedUsers).await
    }

    pub async fn find_all(store: &Store) -> Result<Vec<Self>> {
        let records = store.list_records(RecordSet::ApprovedUsers).await?;
        Ok(records
            .into_iter()
            .map(|r| Self {
                username: r.key,
                approved_at: r.created_at,
            })
            .collect())
    }

    /// Forget an approval. Does not touch existing contributor grants.
    pub async fn revoke(username: &str, store: &Store) -> Result<bool> {
        store.remove(RecordSet::ApprovedUsers, username).await
    }
}
