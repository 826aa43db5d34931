use super::RecordStore;
use crate::error::{Result, StoreError};
use crate::record::Record;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

/// Record store backed by the `items` table of a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and ensure the schema exists
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if url.contains(":memory:") {
            // every connection to :memory: is its own database; keep exactly one alive
            pool_options = pool_options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        info!(url = %url, "Record store ready");
        Ok(store)
    }

    /// Wrap an existing pool; call [`SqliteStore::ensure_schema`] before use
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create the `items` table if absent
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                value TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn read_all(&self) -> Result<Vec<Record>> {
        // rows written by other tools may carry NULLs; they read back as `None`
        let records = sqlx::query_as::<_, Record>("SELECT id, name, value FROM items ORDER BY id")
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn insert(&self, name: &str, value: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO items (name, value) VALUES (?, ?)")
            .bind(name)
            .bind(value)
            .execute(&self.pool)
            .await?;
        let id = result.last_insert_rowid();
        debug!(id, name, value, "Record inserted");
        Ok(id)
    }

    async fn update(&self, id: i64, value: &str) -> Result<()> {
        let result = sqlx::query("UPDATE items SET value = ? WHERE id = ?")
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!(id, value, "Record updated");
        Ok(())
    }
}
