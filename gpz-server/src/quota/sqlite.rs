//! SQLite-backed counter store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::domain::UsageMonth;

use super::error::QuotaError;
use super::store::{QuotaStore, UsageCounter};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS usage_counters (
    user_id TEXT NOT NULL,
    month TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
    PRIMARY KEY (user_id, month)
)
"#;

/// Counter store persisted in SQLite.
///
/// Atomicity comes from single-statement upserts on the `(user_id, month)`
/// primary key, so concurrent requests never lose an increment and never
/// create duplicate counters.
#[derive(Debug, Clone)]
pub struct SqliteQuotaStore {
    pool: SqlitePool,
}

impl SqliteQuotaStore {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self, QuotaError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database, gone when the store is dropped.
    pub async fn in_memory() -> Result<Self, QuotaError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Each connection to :memory: is a separate database, so pin one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the counter table if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, QuotaError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        debug!("usage_counters table ready");
        Ok(Self { pool })
    }

    /// Overwrite a counter.
    ///
    /// Intended for administration and tests; lookups only ever increment.
    pub async fn set_count(
        &self,
        user_id: &str,
        month: &UsageMonth,
        count: u32,
    ) -> Result<(), QuotaError> {
        sqlx::query(
            "INSERT INTO usage_counters (user_id, month, count) VALUES (?1, ?2, ?3) \
             ON CONFLICT(user_id, month) DO UPDATE SET count = excluded.count",
        )
        .bind(user_id)
        .bind(month.as_str())
        .bind(i64::from(count))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn to_count(user_id: &str, month: &UsageMonth, raw: i64) -> Result<u32, QuotaError> {
    u32::try_from(raw).map_err(|_| QuotaError::Corrupt {
        message: format!("counter for {user_id} in {month} holds {raw}"),
    })
}

#[async_trait]
impl QuotaStore for SqliteQuotaStore {
    async fn get_or_create(
        &self,
        user_id: &str,
        month: &UsageMonth,
    ) -> Result<UsageCounter, QuotaError> {
        sqlx::query(
            "INSERT INTO usage_counters (user_id, month, count) VALUES (?1, ?2, 0) \
             ON CONFLICT(user_id, month) DO NOTHING",
        )
        .bind(user_id)
        .bind(month.as_str())
        .execute(&self.pool)
        .await?;

        // Counters are never deleted, so the row exists from here on.
        let row = sqlx::query("SELECT count FROM usage_counters WHERE user_id = ?1 AND month = ?2")
            .bind(user_id)
            .bind(month.as_str())
            .fetch_one(&self.pool)
            .await?;
        let raw: i64 = row.try_get("count")?;

        Ok(UsageCounter {
            user_id: user_id.to_string(),
            month: month.clone(),
            count: to_count(user_id, month, raw)?,
        })
    }

    async fn increment(&self, user_id: &str, month: &UsageMonth) -> Result<u32, QuotaError> {
        let row = sqlx::query(
            "INSERT INTO usage_counters (user_id, month, count) VALUES (?1, ?2, 1) \
             ON CONFLICT(user_id, month) DO UPDATE SET count = count + 1 \
             RETURNING count",
        )
        .bind(user_id)
        .bind(month.as_str())
        .fetch_one(&self.pool)
        .await?;
        let raw: i64 = row.try_get("count")?;

        to_count(user_id, month, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn may() -> UsageMonth {
        UsageMonth::parse("2025-05").unwrap()
    }

    async fn file_store(dir: &TempDir) -> SqliteQuotaStore {
        let url = format!("sqlite://{}", dir.path().join("quota.db").display());
        SqliteQuotaStore::connect(&url).await.unwrap()
    }

    #[tokio::test]
    async fn first_touch_creates_zero() {
        let store = SqliteQuotaStore::in_memory().await.unwrap();

        let counter = store.get_or_create("alice", &may()).await.unwrap();
        assert_eq!(
            counter,
            UsageCounter {
                user_id: "alice".into(),
                month: may(),
                count: 0,
            }
        );

        let again = store.get_or_create("alice", &may()).await.unwrap();
        assert_eq!(again.count, 0);
    }

    #[tokio::test]
    async fn increment_returns_new_count() {
        let store = SqliteQuotaStore::in_memory().await.unwrap();
        let june = UsageMonth::parse("2025-06").unwrap();

        assert_eq!(store.increment("alice", &may()).await.unwrap(), 1);
        assert_eq!(store.increment("alice", &may()).await.unwrap(), 2);
        assert_eq!(store.increment("alice", &june).await.unwrap(), 1);
        assert_eq!(store.increment("bob", &may()).await.unwrap(), 1);

        assert_eq!(store.get_or_create("alice", &may()).await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn set_count_overwrites() {
        let store = SqliteQuotaStore::in_memory().await.unwrap();
        store.increment("alice", &may()).await.unwrap();
        store.set_count("alice", &may(), 99).await.unwrap();

        assert_eq!(store.increment("alice", &may()).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn counters_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = file_store(&dir).await;
            store.increment("alice", &may()).await.unwrap();
            store.increment("alice", &may()).await.unwrap();
        }

        let store = file_store(&dir).await;
        assert_eq!(store.get_or_create("alice", &may()).await.unwrap().count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_all_counted() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(file_store(&dir).await);

        let tasks: Vec<_> = (0..40)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.increment("alice", &may()).await.unwrap() })
            })
            .collect();

        let mut seen: Vec<u32> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        seen.sort_unstable();

        // Every increment observed a distinct count
        assert_eq!(seen, (1..=40).collect::<Vec<_>>());
        assert_eq!(store.get_or_create("alice", &may()).await.unwrap().count, 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_touch_creates_one_counter() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(file_store(&dir).await);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_or_create("bob", &may()).await.unwrap() })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            assert_eq!(result.unwrap().count, 0);
        }

        let row = sqlx::query("SELECT COUNT(*) AS n FROM usage_counters WHERE user_id = 'bob'")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let rows: i64 = row.try_get("n").unwrap();
        assert_eq!(rows, 1);
    }
}
