/// SQLite-backed key/value store
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use soul_core::KeyValueStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Key/value store persisted in a SQLite database
///
/// Each persisted playback domain occupies one row keyed by its storage key.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Open (and create if missing) a database and apply migrations
    ///
    /// # Errors
    /// Returns an error if the connection fails or migrations fail
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Self::run_migrations(&pool).await?;
        debug!("Opened key/value store at {}", database_url);

        Ok(Self { pool })
    }

    /// Create an in-memory store
    ///
    /// Uses a single connection: every SQLite `:memory:` connection is its
    /// own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Create store from an existing pool (migrations are applied)
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool (for testing)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        const MIGRATIONS: &[&str] =
            &[include_str!("../migrations/20250601000001_create_kv_store.sql")];

        for migration in MIGRATIONS {
            sqlx::query(migration)
                .execute(pool)
                .await
                .map_err(|e| StorageError::Migration(e.to_string()))?;
        }

        Ok(())
    }

    async fn upsert(&self, key: &str, blob: &[u8]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(key)
             DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(blob)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = sqlx::query_scalar::<_, Vec<u8>>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn save(&self, key: &str, blob: &[u8]) -> soul_core::Result<()> {
        Ok(self.upsert(key, blob).await?)
    }

    async fn load(&self, key: &str) -> soul_core::Result<Option<Vec<u8>>> {
        Ok(self.fetch(key).await?)
    }

    async fn remove(&self, key: &str) -> soul_core::Result<bool> {
        Ok(self.delete(key).await?)
    }
}
