//! Trend table operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::DbEngine;
use crate::models::TrendItem;

/// Database row for trend table
#[derive(Debug, FromRow)]
struct TrendRow {
    id: String,
    image_url: String,
    description: String,
    source: String,
    scraped_at: i64,
}

impl TrendRow {
    fn into_trend(self) -> TrendItem {
        TrendItem {
            id: self.id,
            image_url: self.image_url,
            description: self.description,
            source: self.source,
            scraped_at: DateTime::<Utc>::from_timestamp_millis(self.scraped_at).unwrap_or_default(),
        }
    }
}

/// Trend table operations
pub struct TrendTable;

impl TrendTable {
    /// Insert or replace a trend, keyed by id
    pub async fn upsert(db: &DbEngine, trend: &TrendItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trend (id, image_url, description, source, scraped_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                image_url = excluded.image_url,
                description = excluded.description,
                source = excluded.source,
                scraped_at = excluded.scraped_at
            "#,
        )
        .bind(&trend.id)
        .bind(&trend.image_url)
        .bind(&trend.description)
        .bind(&trend.source)
        .bind(trend.scraped_at.timestamp_millis())
        .execute(db.pool())
        .await?;

        Ok(())
    }

    /// Most recently scraped trends first
    pub async fn latest(db: &DbEngine, limit: i64) -> Result<Vec<TrendItem>> {
        let rows: Vec<TrendRow> =
            sqlx::query_as("SELECT * FROM trend ORDER BY scraped_at DESC, id LIMIT ?")
                .bind(limit)
                .fetch_all(db.pool())
                .await?;

        Ok(rows.into_iter().map(|r| r.into_trend()).collect())
    }
}
