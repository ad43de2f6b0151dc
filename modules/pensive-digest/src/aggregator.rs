use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use pensive_common::{Priority, Timeframe};
use pensive_store::{AnalyzedContent, ContentStore, DigestRecord, DigestStore, StoreError};

use crate::render::{render_digest_html, DigestItem};

/// How many items a digest shows at most.
pub const DIGEST_TOP_N: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// The user has no content in the requested window. Callers decide
    /// whether to render an empty-state digest instead of erroring.
    #[error("No content in the requested timeframe")]
    NoContent,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sort digest entries: deep-dive before read before skim, newest first
/// within a priority. Entries without an analysis rank as read.
pub fn rank_entries(entries: &mut [AnalyzedContent]) {
    entries.sort_by(|a, b| {
        let pa = priority_of(a).rank();
        let pb = priority_of(b).rank();
        pb.cmp(&pa)
            .then_with(|| b.item.created_at.cmp(&a.item.created_at))
    });
}

fn priority_of(entry: &AnalyzedContent) -> Priority {
    entry
        .analysis
        .as_ref()
        .map(|a| a.priority())
        .unwrap_or(Priority::Read)
}

fn digest_title(timeframe: Timeframe) -> String {
    match timeframe {
        Timeframe::Weekly => "Your weekly digest".to_string(),
        Timeframe::Monthly => "Your monthly digest".to_string(),
        Timeframe::Quarterly => "Your quarterly digest".to_string(),
    }
}

fn to_digest_item(entry: &AnalyzedContent) -> DigestItem {
    DigestItem {
        title: entry.item.title.clone(),
        url: entry.item.url.clone(),
        priority: priority_of(entry),
        summary: entry
            .analysis
            .as_ref()
            .map(|a| a.summary_paragraph.clone())
            .unwrap_or_default(),
    }
}

/// Generates and persists digests over a user's recent analyzed content.
pub struct DigestGenerator {
    content: ContentStore,
    digests: DigestStore,
}

impl DigestGenerator {
    pub fn new(content: ContentStore, digests: DigestStore) -> Self {
        Self { content, digests }
    }

    /// Build, render, and persist a digest for the window ending now.
    pub async fn generate_digest(
        &self,
        user_id: Uuid,
        timeframe: Timeframe,
    ) -> Result<DigestRecord, DigestError> {
        let cutoff = timeframe.cutoff(Utc::now());
        let mut entries = self
            .content
            .with_current_analysis_since(user_id, cutoff)
            .await?;

        if entries.is_empty() {
            return Err(DigestError::NoContent);
        }

        rank_entries(&mut entries);
        entries.truncate(DIGEST_TOP_N);

        let title = digest_title(timeframe);
        let items: Vec<DigestItem> = entries.iter().map(to_digest_item).collect();
        let html = render_digest_html(&title, &items);
        let content_ids: Vec<Uuid> = entries.iter().map(|e| e.item.id).collect();

        let digest = self
            .digests
            .insert(user_id, timeframe, &title, &html, &content_ids)
            .await?;

        info!(
            %user_id,
            timeframe = timeframe.as_str(),
            items = content_ids.len(),
            "Digest generated"
        );

        Ok(digest)
    }

    /// Render a digest fragment from caller-supplied items without touching
    /// the store. Used by the render-only endpoint.
    pub fn render_only(&self, timeframe: Timeframe, items: &[DigestItem]) -> String {
        render_digest_html(&digest_title(timeframe), items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pensive_store::{AnalysisRecord, ContentItem};
    use sqlx::types::Json;

    fn entry(title: &str, priority: Option<Priority>, age_hours: i64) -> AnalyzedContent {
        let item_id = Uuid::new_v4();
        AnalyzedContent {
            item: ContentItem {
                id: item_id,
                user_id: Uuid::nil(),
                title: title.to_string(),
                url: format!("https://example.com/{title}"),
                raw_text: String::new(),
                content_hash: String::new(),
                source: "web".to_string(),
                created_at: Utc::now() - Duration::hours(age_hours),
            },
            analysis: priority.map(|p| AnalysisRecord {
                id: Uuid::new_v4(),
                content_item_id: item_id,
                version: 1,
                is_current: true,
                summary_sentence: String::new(),
                summary_paragraph: format!("Summary of {title}"),
                is_full_read: false,
                entities: Json(vec![]),
                tags: Json(vec![]),
                priority: p.as_str().to_string(),
                confidence: 0.5,
                created_at: Utc::now(),
            }),
        }
    }

    #[test]
    fn ranks_priority_before_recency() {
        let mut entries = vec![
            entry("old-deep", Some(Priority::DeepDive), 48),
            entry("new-skim", Some(Priority::Skim), 1),
            entry("new-read", Some(Priority::Read), 2),
        ];
        rank_entries(&mut entries);
        let titles: Vec<&str> = entries.iter().map(|e| e.item.title.as_str()).collect();
        assert_eq!(titles, vec!["old-deep", "new-read", "new-skim"]);
    }

    #[test]
    fn within_priority_newest_first() {
        let mut entries = vec![
            entry("older", Some(Priority::Read), 10),
            entry("newer", Some(Priority::Read), 1),
        ];
        rank_entries(&mut entries);
        assert_eq!(entries[0].item.title, "newer");
    }

    #[test]
    fn missing_analysis_ranks_as_read() {
        let mut entries = vec![
            entry("skim", Some(Priority::Skim), 1),
            entry("unanalyzed", None, 5),
        ];
        rank_entries(&mut entries);
        assert_eq!(entries[0].item.title, "unanalyzed");
    }
}
