// Feed subscriptions. Rows are mutated by the poller on every attempt;
// repeated failures deactivate rather than delete.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// Consecutive failures before a feed is deactivated.
pub const FEED_MAX_ERRORS: i32 = 5;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Feed {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub is_active: bool,
    pub fetch_interval_seconds: i32,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_item_seen_at: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub error_count: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct FeedStore {
    pool: PgPool,
}

impl FeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe a user to a feed URL. Resubscribing an existing (possibly
    /// deactivated) feed reactivates it and clears its error state.
    pub async fn subscribe(&self, user_id: Uuid, url: &str, title: Option<&str>) -> Result<Feed> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (user_id, url, title)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, url)
            DO UPDATE SET is_active = true, error_count = 0, last_error = NULL,
                          title = COALESCE(EXCLUDED.title, feeds.title)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(url)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(feed)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, Feed>(
            "SELECT * FROM feeds WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Active feeds whose polling interval has elapsed.
    pub async fn due_feeds(&self, limit: i64) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, Feed>(
            r#"
            SELECT * FROM feeds
            WHERE is_active
              AND (last_fetched_at IS NULL
                   OR last_fetched_at + make_interval(secs => fetch_interval_seconds) <= now())
            ORDER BY last_fetched_at ASC NULLS FIRST
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Record a successful poll: clear error state, advance watermarks, and
    /// store the validators for the next conditional GET.
    pub async fn record_success(
        &self,
        id: Uuid,
        title: Option<&str>,
        etag: Option<&str>,
        last_modified: Option<&str>,
        last_item_seen_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE feeds SET
                last_fetched_at = now(),
                error_count = 0,
                last_error = NULL,
                title = COALESCE($2, title),
                etag = COALESCE($3, etag),
                last_modified = COALESCE($4, last_modified),
                last_item_seen_at = GREATEST(last_item_seen_at, $5)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(etag)
        .bind(last_modified)
        .bind(last_item_seen_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed poll. The feed is deactivated once it accumulates
    /// `FEED_MAX_ERRORS` consecutive failures. Returns the updated row.
    pub async fn record_failure(&self, id: Uuid, error: &str) -> Result<Feed> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            UPDATE feeds SET
                last_fetched_at = now(),
                error_count = error_count + 1,
                last_error = $2,
                is_active = (error_count + 1) < $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(FEED_MAX_ERRORS)
        .fetch_one(&self.pool)
        .await?;

        Ok(feed)
    }
}
