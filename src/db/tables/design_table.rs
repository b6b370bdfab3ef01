//! Design table operations

use anyhow::Result;
use sqlx::FromRow;

use crate::db::DbEngine;
use crate::models::DesignItem;

/// Database row for design table
#[derive(Debug, FromRow)]
struct DesignRow {
    id: String,
    user_id: String,
    image: Option<String>,
    prompt: Option<String>,
    style_id: Option<i64>,
    created_at: i64,
}

impl DesignRow {
    fn into_design(self) -> DesignItem {
        DesignItem {
            id: self.id,
            user_id: self.user_id,
            image: self.image,
            prompt: self.prompt,
            style_id: self.style_id,
            created_at: self.created_at,
        }
    }
}

/// Design table operations
pub struct DesignTable;

impl DesignTable {
    /// Insert or replace a design, keyed by id
    pub async fn upsert(db: &DbEngine, design: &DesignItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO design (id, user_id, image, prompt, style_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                image = excluded.image,
                prompt = excluded.prompt,
                style_id = excluded.style_id,
                created_at = excluded.created_at
            "#,
        )
        .bind(&design.id)
        .bind(&design.user_id)
        .bind(&design.image)
        .bind(&design.prompt)
        .bind(design.style_id)
        .bind(design.created_at)
        .execute(db.pool())
        .await?;

        Ok(())
    }

    /// Get every design in store order
    pub async fn all(db: &DbEngine) -> Result<Vec<DesignItem>> {
        let rows: Vec<DesignRow> =
            sqlx::query_as("SELECT * FROM design ORDER BY created_at, id")
                .fetch_all(db.pool())
                .await?;

        Ok(rows.into_iter().map(|r| r.into_design()).collect())
    }

    /// Get designs owned by a user
    pub async fn by_user(db: &DbEngine, user_id: &str) -> Result<Vec<DesignItem>> {
        let rows: Vec<DesignRow> =
            sqlx::query_as("SELECT * FROM design WHERE user_id = ? ORDER BY created_at, id")
                .bind(user_id)
                .fetch_all(db.pool())
                .await?;

        Ok(rows.into_iter().map(|r| r.into_design()).collect())
    }

    /// Get up to `limit` designs carrying `style_id` that `user_id` does not own
    pub async fn by_style_excluding_user(
        db: &DbEngine,
        style_id: i64,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<DesignItem>> {
        let rows: Vec<DesignRow> = sqlx::query_as(
            r#"
            SELECT * FROM design
            WHERE style_id = ? AND user_id != ?
            ORDER BY created_at, id
            LIMIT ?
            "#,
        )
        .bind(style_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(db.pool())
        .await?;

        Ok(rows.into_iter().map(|r| r.into_design()).collect())
    }

    /// Write every `(id, style_id)` pair in one transaction.
    ///
    /// Either all labels land or none do. Returns the number of rows updated.
    pub async fn apply_style_labels(db: &DbEngine, labels: &[(String, i64)]) -> Result<u64> {
        let mut tx = db.pool().begin().await?;
        let mut updated = 0;

        for (id, style_id) in labels {
            let result = sqlx::query("UPDATE design SET style_id = ? WHERE id = ?")
                .bind(style_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;

        Ok(updated)
    }

    /// Count all designs
    pub async fn count(db: &DbEngine) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM design")
            .fetch_one(db.pool())
            .await?;

        Ok(row.0)
    }
}
