//! SQLite implementation of the durable store.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::OnceCell;

use super::{DurableStore, Partition};
use crate::error::CacheError;

/// Schema version written to `PRAGMA user_version` after the upgrade step.
pub const SCHEMA_VERSION: i64 = 1;

/// SQLite-backed durable store using `sqlx::SqlitePool`.
///
/// The pool is opened on first use. Concurrent first calls wait on the same
/// [`OnceCell`] initialization and end up sharing one pool; a failed open
/// leaves the cell empty so the next call retries.
///
/// Each [`Partition`] is a two-column table holding one serialized
/// snapshot per key. Tables are created only while upgrading from an older
/// `user_version`.
///
/// In-memory URLs (`sqlite::memory:`) give every connection its own
/// database, so use `max_connections = 1` with them.
#[derive(Debug)]
pub struct SqliteDurableStore {
    url: String,
    max_connections: u32,
    pool: OnceCell<SqlitePool>,
}

impl SqliteDurableStore {
    /// Creates a store that will connect to `url` on first use.
    #[must_use]
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections: max_connections.max(1),
            pool: OnceCell::new(),
        }
    }

    /// Opens the pool and runs the upgrade step. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Durable`] if the database cannot be opened or
    /// the partitions cannot be created.
    pub async fn open(&self) -> Result<(), CacheError> {
        self.pool().await.map(|_| ())
    }

    /// Returns `true` once the pool has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.pool.initialized()
    }

    async fn pool(&self) -> Result<&SqlitePool, CacheError> {
        self.pool
            .get_or_try_init(|| open_pool(&self.url, self.max_connections))
            .await
    }
}

async fn open_pool(url: &str, max_connections: u32) -> Result<SqlitePool, CacheError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    upgrade(&pool).await?;
    tracing::debug!(url, "durable store opened");
    Ok(pool)
}

/// Creates the partitions when the database is older than
/// [`SCHEMA_VERSION`].
async fn upgrade(pool: &SqlitePool) -> Result<(), CacheError> {
    let mut tx = pool.begin().await?;
    let version = sqlx::query_scalar::<_, i64>("PRAGMA user_version")
        .fetch_one(&mut *tx)
        .await?;

    if version < SCHEMA_VERSION {
        for partition in Partition::ALL {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} \
                 (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
                partition.name()
            );
            sqlx::query(&ddl).execute(&mut *tx).await?;
        }
        let bump = format!("PRAGMA user_version = {SCHEMA_VERSION}");
        sqlx::query(&bump).execute(&mut *tx).await?;
        tracing::info!(from = version, to = SCHEMA_VERSION, "durable store upgraded");
    }

    tx.commit().await?;
    Ok(())
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>, CacheError> {
        let pool = self.pool().await?;
        let sql = format!("SELECT value FROM {} WHERE key = ?", partition.name());
        let raw = sqlx::query_scalar::<_, String>(&sql)
            .bind(key)
            .fetch_optional(pool)
            .await?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, partition: Partition, key: &str, value: &Value) -> Result<(), CacheError> {
        let pool = self.pool().await?;
        let sql = format!(
            "INSERT INTO {} (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            partition.name()
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(value.to_string())
            .execute(pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<(), CacheError> {
        let pool = self.pool().await?;
        let sql = format!("DELETE FROM {} WHERE key = ?", partition.name());
        sqlx::query(&sql).bind(key).execute(pool).await?;
        Ok(())
    }
}
