use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::config::Config;
use crate::error::Result;

mod memory;

pub use memory::MemoryStorage;

/// Key holding the JSON array of clients
pub const CLIENTS_KEY: &str = "clients";
/// Key holding the saved spreadsheet column mapping
pub const COLUMN_MAPPING_KEY: &str = "excelColumnMapping";

/// Durable key-value storage for JSON documents
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed storage
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database named by the configuration
    pub async fn new(config: &Config) -> Result<Self> {
        Self::connect(config.database_url()).await
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // A single connection keeps `sqlite::memory:` databases alive and shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        debug!(url, "storage opened");
        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(self.get_pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Storage for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(self.get_pool())
            .await?;

        Ok(value.map(|(v,)| v))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(self.get_pool())
            .await?;

        Ok(())
    }
}

/// Open the configured database
pub async fn init(config: &Config) -> Result<Database> {
    Database::new(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_round_trip_and_overwrite() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        assert_eq!(db.get(CLIENTS_KEY).await.unwrap(), None);

        db.set(CLIENTS_KEY, "[]").await.unwrap();
        db.set(CLIENTS_KEY, r#"[{"firstName":"Ana"}]"#).await.unwrap();
        assert_eq!(
            db.get(CLIENTS_KEY).await.unwrap().as_deref(),
            Some(r#"[{"firstName":"Ana"}]"#)
        );

        db.remove(CLIENTS_KEY).await.unwrap();
        assert_eq!(db.get(CLIENTS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.set(CLIENTS_KEY, "[]").await.unwrap();
        db.set(COLUMN_MAPPING_KEY, "{}").await.unwrap();
        db.remove(COLUMN_MAPPING_KEY).await.unwrap();
        assert_eq!(db.get(CLIENTS_KEY).await.unwrap().as_deref(), Some("[]"));
    }
}
