// Persisted digests. Immutable once sent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use pensive_common::Timeframe;

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DigestRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub timeframe: String,
    pub title: String,
    pub html_content: String,
    pub content_ids: Json<Vec<Uuid>>,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DigestStore {
    pool: PgPool,
}

impl DigestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        user_id: Uuid,
        timeframe: Timeframe,
        title: &str,
        html_content: &str,
        content_ids: &[Uuid],
    ) -> Result<DigestRecord> {
        let record = sqlx::query_as::<_, DigestRecord>(
            r#"
            INSERT INTO digests (user_id, timeframe, title, html_content, content_ids)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(timeframe.as_str())
        .bind(title)
        .bind(html_content)
        .bind(Json(content_ids))
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<DigestRecord>> {
        let rows = sqlx::query_as::<_, DigestRecord>(
            r#"
            SELECT * FROM digests
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn mark_sent(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE digests SET status = 'sent', sent_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
