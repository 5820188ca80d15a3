//! SQLite digest store implementation

use async_trait::async_trait;
use costcat_sync_domain::{DIGEST_SENTINEL, DigestStore, DigestStoreError};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;

/// SQLite-backed digest store
pub struct SqliteDigestStore {
    pool: SqlitePool,
}

impl SqliteDigestStore {
    /// Create a new SQLite digest store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, DigestStoreError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DigestStoreError::Database(format!("Failed to create directory: {}", e))
            })?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| DigestStoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, DigestStoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DigestStoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), DigestStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS digests (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DigestStoreError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl DigestStore for SqliteDigestStore {
    async fn get_digest(&self, key: &str) -> Result<String, DigestStoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM digests WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DigestStoreError::Database(e.to_string()))?;

        Ok(row
            .map(|(value,)| value)
            .unwrap_or_else(|| DIGEST_SENTINEL.to_string()))
    }

    async fn put_digest(&self, key: &str, value: &str) -> Result<(), DigestStoreError> {
        let updated_at = OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| DigestStoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO digests (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DigestStoreError::Database(e.to_string()))?;

        tracing::debug!(key = %key, "Stored digest");
        Ok(())
    }
}
