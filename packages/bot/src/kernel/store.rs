//! Durable key-set storage shared by every watcher.
//!
//! Three logical sets live in SQLite, one table each. All mutations across all
//! sets go through a single async mutex and run in their own transaction, so
//! the exists-check and the insert of `insert_if_absent` cannot interleave with
//! another writer. Reads take no lock; a reader may see a set mid-update and
//! simply catches up on its next poll.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;

/// The record sets the store owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSet {
    /// Request posts awaiting a moderator decision
    PendingRequests,
    /// Subreddits whose contributors the bot manages
    RestrictedSubreddits,
    /// Users granted access to every restricted subreddit
    ApprovedUsers,
}

/// Static SQL for one record set.
struct SetSql {
    exists: &'static str,
    insert: &'static str,
    delete: &'static str,
    keys: &'static str,
    records: &'static str,
}

impl RecordSet {
    pub const ALL: [RecordSet; 3] = [
        RecordSet::PendingRequests,
        RecordSet::RestrictedSubreddits,
        RecordSet::ApprovedUsers,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RecordSet::PendingRequests => "pending",
            RecordSet::RestrictedSubreddits => "restricted",
            RecordSet::ApprovedUsers => "approved",
        }
    }

    fn sql(&self) -> SetSql {
        match self {
            RecordSet::PendingRequests => SetSql {
                exists: "SELECT 1 FROM request_posts WHERE post_id = ?",
                insert: "INSERT INTO request_posts (post_id) VALUES (?)",
                delete: "DELETE FROM request_posts WHERE post_id = ?",
                keys: "SELECT post_id FROM request_posts ORDER BY id",
                records: "SELECT post_id, created_at FROM request_posts ORDER BY id",
            },
            RecordSet::RestrictedSubreddits => SetSql {
                exists: "SELECT 1 FROM restricted_subreddits WHERE subreddit_name = ?",
                insert: "INSERT INTO restricted_subreddits (subreddit_name) VALUES (?)",
                delete: "DELETE FROM restricted_subreddits WHERE subreddit_name = ?",
                keys: "SELECT subreddit_name FROM restricted_subreddits ORDER BY id",
                records: "SELECT subreddit_name, created_at FROM restricted_subreddits ORDER BY id",
            },
            RecordSet::ApprovedUsers => SetSql {
                exists: "SELECT 1 FROM approved_users WHERE username = ?",
                insert: "INSERT INTO approved_users (username) VALUES (?)",
                delete: "DELETE FROM approved_users WHERE username = ?",
                keys: "SELECT username FROM approved_users ORDER BY id",
                records: "SELECT username, created_at FROM approved_users ORDER BY id",
            },
        }
    }
}

impl FromStr for RecordSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordSet::ALL
            .into_iter()
            .find(|set| set.label().eq_ignore_ascii_case(s.trim()))
            .with_context(|| format!("unknown record set '{}' (pending, restricted, approved)", s))
    }
}

/// A stored key with the time it was first recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: String,
    pub created_at: DateTime<Utc>,
}

/// Handle to the bot database. Clones share the pool and the write lock.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl Store {
    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid DATABASE_URL: {}", url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database, for tests and dry runs.
    ///
    /// Pinned to one connection that never recycles: every SQLite `:memory:`
    /// connection is a separate database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Insert `key` unless it is already present. Returns whether a row was added.
    pub async fn insert_if_absent(&self, set: RecordSet, key: &str) -> Result<bool> {
        let sql = set.sql();
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(sql.exists)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("Failed to look up {} record", set.label()))?;
        if existing.is_some() {
            return Ok(false);
        }

        match sqlx::query(sql.insert).bind(key).execute(&mut *tx).await {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Ok(false),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to insert {} record", set.label()))
            }
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit {} record", set.label()))?;
        Ok(true)
    }

    /// Remove `key`. Returns whether a row was deleted.
    pub async fn remove(&self, set: RecordSet, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(set.sql().delete)
            .bind(key)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to delete {} record", set.label()))?;

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit {} removal", set.label()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Every key in the set, in insertion order.
    pub async fn list_all(&self, set: RecordSet) -> Result<Vec<String>> {
        sqlx::query_scalar(set.sql().keys)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} records", set.label()))
    }

    /// Every record in the set with its creation time, in insertion order.
    pub async fn list_records(&self, set: RecordSet) -> Result<Vec<StoredRecord>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(set.sql().records)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} records", set.label()))?;

        Ok(rows
            .into_iter()
            .map(|(key, created_at)| StoredRecord {
                key,
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
            })
            .collect())
    }

    pub async fn contains(&self, set: RecordSet, key: &str) -> Result<bool> {
        let existing: Option<i64> = sqlx::query_scalar(set.sql().exists)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to look up {} record", set.label()))?;
        Ok(existing.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_if_absent_is_idempotent() {
        let store = Store::in_memory().await.unwrap();

        for set in RecordSet::ALL {
            assert!(store.insert_if_absent(set, "k1").await.unwrap());
            assert!(!store.insert_if_absent(set, "k1").await.unwrap());
            assert_eq!(store.list_all(set).await.unwrap(), vec!["k1".to_string()]);
        }
    }

    #[tokio::test]
    async fn sets_are_independent() {
        let store = Store::in_memory().await.unwrap();
        store
            .insert_if_absent(RecordSet::ApprovedUsers, "alice")
            .await
            .unwrap();

        assert!(store.contains(RecordSet::ApprovedUsers, "alice").await.unwrap());
        assert!(!store.contains(RecordSet::PendingRequests, "alice").await.unwrap());
        assert!(store
            .list_all(RecordSet::RestrictedSubreddits)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn reddit_names_compare_case_insensitively() {
        let store = Store::in_memory().await.unwrap();

        assert!(store
            .insert_if_absent(RecordSet::RestrictedSubreddits, "Sub3")
            .await
            .unwrap());
        assert!(!store
            .insert_if_absent(RecordSet::RestrictedSubreddits, "sub3")
            .await
            .unwrap());
        assert!(store
            .insert_if_absent(RecordSet::ApprovedUsers, "Alice")
            .await
            .unwrap());
        assert!(!store
            .insert_if_absent(RecordSet::ApprovedUsers, "ALICE")
            .await
            .unwrap());

        assert_eq!(
            store.list_all(RecordSet::RestrictedSubreddits).await.unwrap(),
            vec!["Sub3"]
        );
        assert!(store.contains(RecordSet::ApprovedUsers, "alice").await.unwrap());
        assert!(store
            .remove(RecordSet::RestrictedSubreddits, "SUB3")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = Store::in_memory().await.unwrap();
        for name in ["zeta", "alpha", "mid"] {
            store
                .insert_if_absent(RecordSet::RestrictedSubreddits, name)
                .await
                .unwrap();
        }

        assert_eq!(
            store.list_all(RecordSet::RestrictedSubreddits).await.unwrap(),
            vec!["zeta", "alpha", "mid"]
        );
    }

    #[tokio::test]
    async fn remove_reports_whether_anything_was_deleted() {
        let store = Store::in_memory().await.unwrap();
        store
            .insert_if_absent(RecordSet::PendingRequests, "123")
            .await
            .unwrap();

        assert!(store.remove(RecordSet::PendingRequests, "123").await.unwrap());
        assert!(!store.remove(RecordSet::PendingRequests, "123").await.unwrap());
        assert!(store.list_all(RecordSet::PendingRequests).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_inserts_keep_one_row() {
        let store = Store::in_memory().await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert_if_absent(RecordSet::ApprovedUsers, "alice")
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.list_all(RecordSet::ApprovedUsers).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn records_carry_timestamps() {
        let store = Store::in_memory().await.unwrap();
        store
            .insert_if_absent(RecordSet::ApprovedUsers, "alice")
            .await
            .unwrap();

        let records = store.list_records(RecordSet::ApprovedUsers).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "alice");
        assert!(records[0].created_at.timestamp() > 0);
    }

    #[test]
    fn record_sets_parse_from_labels() {
        assert_eq!("pending".parse::<RecordSet>().unwrap(), RecordSet::PendingRequests);
        assert_eq!(
            "Restricted".parse::<RecordSet>().unwrap(),
            RecordSet::RestrictedSubreddits
        );
        assert_eq!("approved".parse::<RecordSet>().unwrap(), RecordSet::ApprovedUsers);
        assert!("users".parse::<RecordSet>().is_err());
    }
}
