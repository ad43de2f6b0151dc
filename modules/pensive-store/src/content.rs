// Content items and their versioned analyses.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use pensive_common::{fingerprint, Analysis, ContentSource, Entity, Priority, Timeframe};

use crate::error::Result;

/// A row from the content_items table. Immutable after insert.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub url: String,
    pub raw_text: String,
    pub content_hash: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// A row from the analyses table. One current version per content item.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub content_item_id: Uuid,
    pub version: i32,
    pub is_current: bool,
    pub summary_sentence: String,
    pub summary_paragraph: String,
    pub is_full_read: bool,
    pub entities: Json<Vec<Entity>>,
    pub tags: Json<Vec<String>>,
    pub priority: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn priority(&self) -> Priority {
        Priority::parse(&self.priority).unwrap_or(Priority::Read)
    }
}

/// Parameters for storing a new piece of content.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub url: String,
    pub text: String,
    pub source: ContentSource,
}

/// Outcome of a store attempt. `is_new = false` means the fingerprint
/// already existed and no row was created.
#[derive(Debug, Clone, Copy)]
pub struct StoredContent {
    pub content_id: Uuid,
    pub is_new: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContentQuery {
    pub page: u32,
    pub limit: u32,
    pub source: Option<ContentSource>,
    pub priority: Option<Priority>,
    pub timeframe: Option<Timeframe>,
}

#[derive(Debug, Serialize)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub total: i64,
    pub has_more: bool,
    pub page: u32,
    pub total_pages: u32,
}

/// A content item paired with its current analysis, if one exists.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedContent {
    pub item: ContentItem,
    pub analysis: Option<AnalysisRecord>,
}

#[derive(Clone)]
pub struct ContentStore {
    pool: PgPool,
}

impl ContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store content for a user, deduplicated by fingerprint. The insert is
    /// atomic: concurrent submissions of identical (url, text) resolve to a
    /// single row, with exactly one caller seeing `is_new = true`.
    pub async fn store_content(&self, user_id: Uuid, content: NewContent) -> Result<StoredContent> {
        let hash = fingerprint(&content.url, &content.text);

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO content_items (user_id, title, url, raw_text, content_hash, source)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, content_hash) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&content.title)
        .bind(&content.url)
        .bind(&content.text)
        .bind(&hash)
        .bind(content.source.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(StoredContent {
                content_id: id,
                is_new: true,
            });
        }

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM content_items WHERE user_id = $1 AND content_hash = $2",
        )
        .bind(user_id)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(StoredContent {
            content_id: existing,
            is_new: false,
        })
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<ContentItem>> {
        let row = sqlx::query_as::<_, ContentItem>(
            "SELECT * FROM content_items WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Paginated listing, newest first, with optional source/priority/time
    /// filters. The priority filter joins against current analyses.
    pub async fn get_user_content(&self, user_id: Uuid, query: ContentQuery) -> Result<ContentPage> {
        let page = query.page.max(1);
        let limit = query.limit.clamp(1, 100);
        let offset = (page - 1) as i64 * limit as i64;

        let source = query.source.map(|s| s.as_str().to_string());
        let priority = query.priority.map(|p| p.as_str().to_string());
        let cutoff = query.timeframe.map(|t| t.cutoff(Utc::now()));

        const FILTER: &str = r#"
            c.user_id = $1
              AND ($2::text IS NULL OR c.source = $2)
              AND ($3::timestamptz IS NULL OR c.created_at >= $3)
              AND ($4::text IS NULL OR EXISTS (
                    SELECT 1 FROM analyses a
                    WHERE a.content_item_id = c.id AND a.is_current AND a.priority = $4))
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT count(*) FROM content_items c WHERE {FILTER}"
        ))
        .bind(user_id)
        .bind(&source)
        .bind(cutoff)
        .bind(&priority)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, ContentItem>(&format!(
            r#"
            SELECT c.* FROM content_items c
            WHERE {FILTER}
            ORDER BY c.created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(user_id)
        .bind(&source)
        .bind(cutoff)
        .bind(&priority)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_pages = (total as u64).div_ceil(limit as u64) as u32;

        Ok(ContentPage {
            has_more: page < total_pages,
            items,
            total,
            page,
            total_pages,
        })
    }

    /// Best-effort substring search over title and body. Not full-text.
    pub async fn search(&self, user_id: Uuid, query: &str) -> Result<Vec<ContentItem>> {
        let pattern = format!("%{}%", escape_like(query));

        let rows = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT * FROM content_items
            WHERE user_id = $1 AND (title ILIKE $2 OR raw_text ILIKE $2)
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Explicit user deletion. Returns false if the item wasn't theirs.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content_items WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a new analysis version and flip the current pointer, in one
    /// transaction. Version numbers are per content item, starting at 1.
    pub async fn insert_analysis(
        &self,
        content_item_id: Uuid,
        analysis: &Analysis,
    ) -> Result<AnalysisRecord> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE analyses SET is_current = false WHERE content_item_id = $1 AND is_current",
        )
        .bind(content_item_id)
        .execute(&mut *tx)
        .await?;

        let record = sqlx::query_as::<_, AnalysisRecord>(
            r#"
            INSERT INTO analyses
                (content_item_id, version, is_current, summary_sentence, summary_paragraph,
                 is_full_read, entities, tags, priority, confidence)
            VALUES
                ($1,
                 COALESCE((SELECT max(version) FROM analyses WHERE content_item_id = $1), 0) + 1,
                 true, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(content_item_id)
        .bind(&analysis.summary_sentence)
        .bind(&analysis.summary_paragraph)
        .bind(analysis.is_full_read)
        .bind(Json(&analysis.entities))
        .bind(Json(&analysis.tags))
        .bind(analysis.priority.as_str())
        .bind(analysis.confidence.clamp(0.0, 1.0))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record)
    }

    pub async fn current_analysis(&self, content_item_id: Uuid) -> Result<Option<AnalysisRecord>> {
        let row = sqlx::query_as::<_, AnalysisRecord>(
            "SELECT * FROM analyses WHERE content_item_id = $1 AND is_current",
        )
        .bind(content_item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Content created at or after `cutoff`, newest first, each paired with
    /// its current analysis.
    pub async fn with_current_analysis_since(
        &self,
        user_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AnalyzedContent>> {
        let items = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT * FROM content_items
            WHERE user_id = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let analyses = sqlx::query_as::<_, AnalysisRecord>(
            "SELECT * FROM analyses WHERE content_item_id = ANY($1) AND is_current",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_item: HashMap<Uuid, AnalysisRecord> = analyses
            .into_iter()
            .map(|a| (a.content_item_id, a))
            .collect();

        Ok(items
            .into_iter()
            .map(|item| {
                let analysis = by_item.remove(&item.id);
                AnalyzedContent { item, analysis }
            })
            .collect())
    }

    /// Users who stored content at or after `cutoff`. Drives digest fan-out.
    pub async fn users_with_content_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let rows = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT user_id FROM content_items WHERE created_at >= $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Escape LIKE metacharacters in user-supplied search input.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_handles_metacharacters() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
