//! Database engine and connection management

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Database engine wrapper, shared by handle with every component that
/// reads or writes the catalogue
#[derive(Clone)]
pub struct DbEngine {
    pool: SqlitePool,
}

impl DbEngine {
    /// Open (or create) the catalogue database at `db_path`
    pub async fn connect(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .pragma("cache_size", "10000")
            .pragma("temp_store", "FILE");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database {}", db_path.display()))?;

        let engine = Self { pool };
        engine.create_tables().await?;

        Ok(engine)
    }

    /// Private in-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // a single connection that never expires keeps the database alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let engine = Self { pool };
        engine.create_tables().await?;

        Ok(engine)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all database tables
    async fn create_tables(&self) -> Result<()> {
        // Design table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS design (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                image TEXT,
                prompt TEXT,
                style_id INTEGER,
                created_at INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_design_user_id ON design(user_id);
            CREATE INDEX IF NOT EXISTS idx_design_style_id ON design(style_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Trend table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trend (
                id TEXT PRIMARY KEY,
                image_url TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL DEFAULT '',
                scraped_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trend_scraped_at ON trend(scraped_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
