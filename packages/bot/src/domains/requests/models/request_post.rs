use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::kernel::{RecordSet, Store};

/// RequestPost model - a request awaiting a moderator decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPost {
    pub post_id: String,
    pub discovered_at: DateTime<Utc>,
}

impl RequestPost {
    /// Start tracking a request post. Returns `false` if it was already tracked.
    pub async fn track(post_id: &str, store: &Store) -> Result<bool> {
        store
            .insert_if_absent(RecordSet::PendingRequests, post_id)
            .await
    }

    /// Ids of every tracked post, oldest first
    pub async fn find_all_ids(store: &Store) -> Result<Vec<String>> {
        store.list_all(RecordSet::PendingRequests).await
    }

    pub async fn find_all(store: &Store) -> Result<Vec<Self>> {
        let records = store.list_records(RecordSet::PendingRequests).await?;
        Ok(records
            .into_iter()
            .map(|r| Self {
                post_id: r.key,
                discovered_at: r.created_at,
            })
            .collect())
    }

    /// Stop tracking a resolved post
    pub async fn retire(post_id: &str, store: &Store) -> Result<bool> {
        store.remove(RecordSet::PendingRequests, post_id).await
    }

    /// Lock-free membership check
    pub async fn is_tracked(post_id: &str, store: &Store) -> Result<bool> {
        store.contains(RecordSet::PendingRequests, post_id).await
    }
}
