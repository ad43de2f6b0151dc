//! Integration tests for digest generation.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use sqlx::PgPool;
use uuid::Uuid;

use pensive_common::{Analysis, ContentSource, Priority, Timeframe};
use pensive_digest::{DigestError, DigestGenerator};
use pensive_store::{ContentStore, DigestStore, NewContent};

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    pensive_store::migrate(&pool).await.ok()?;
    Some(pool)
}

fn analysis(priority: Priority) -> Analysis {
    Analysis {
        summary_sentence: "Sentence.".into(),
        summary_paragraph: "Paragraph.".into(),
        is_full_read: false,
        entities: vec![],
        tags: vec![],
        relationships: vec![],
        priority,
        confidence: 0.7,
    }
}

#[tokio::test]
async fn weekly_digest_excludes_items_older_than_seven_days() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let content = ContentStore::new(pool.clone());
    let generator = DigestGenerator::new(content.clone(), DigestStore::new(pool.clone()));
    let user = Uuid::new_v4();

    let fresh = content
        .store_content(
            user,
            NewContent {
                title: "Fresh article".into(),
                url: "https://example.com/fresh".into(),
                text: "fresh".into(),
                source: ContentSource::Web,
            },
        )
        .await
        .unwrap();
    content
        .insert_analysis(fresh.content_id, &analysis(Priority::Read))
        .await
        .unwrap();

    let stale = content
        .store_content(
            user,
            NewContent {
                title: "Stale article".into(),
                url: "https://example.com/stale".into(),
                text: "stale".into(),
                source: ContentSource::Web,
            },
        )
        .await
        .unwrap();
    content
        .insert_analysis(stale.content_id, &analysis(Priority::DeepDive))
        .await
        .unwrap();
    // Backdate past the weekly window.
    sqlx::query("UPDATE content_items SET created_at = now() - interval '8 days' WHERE id = $1")
        .bind(stale.content_id)
        .execute(&pool)
        .await
        .unwrap();

    let digest = generator
        .generate_digest(user, Timeframe::Weekly)
        .await
        .unwrap();

    assert_eq!(digest.content_ids.0, vec![fresh.content_id]);
    assert!(digest.html_content.contains("Fresh article"));
    assert!(!digest.html_content.contains("Stale article"));
}

#[tokio::test]
async fn empty_window_raises_no_content() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let generator =
        DigestGenerator::new(ContentStore::new(pool.clone()), DigestStore::new(pool));

    let result = generator
        .generate_digest(Uuid::new_v4(), Timeframe::Weekly)
        .await;

    assert!(matches!(result, Err(DigestError::NoContent)));
}

#[tokio::test]
async fn digest_orders_deep_dive_first() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let content = ContentStore::new(pool.clone());
    let generator = DigestGenerator::new(content.clone(), DigestStore::new(pool));
    let user = Uuid::new_v4();

    for (n, priority) in [(1, Priority::Skim), (2, Priority::DeepDive), (3, Priority::Read)] {
        let stored = content
            .store_content(
                user,
                NewContent {
                    title: format!("Item {n}"),
                    url: format!("https://example.com/{n}"),
                    text: format!("text {n}"),
                    source: ContentSource::Web,
                },
            )
            .await
            .unwrap();
        content
            .insert_analysis(stored.content_id, &analysis(priority))
            .await
            .unwrap();
    }

    let digest = generator
        .generate_digest(user, Timeframe::Weekly)
        .await
        .unwrap();

    let deep_pos = digest.html_content.find("Item 2").unwrap();
    let read_pos = digest.html_content.find("Item 3").unwrap();
    let skim_pos = digest.html_content.find("Item 1").unwrap();
    assert!(deep_pos < read_pos);
    assert!(read_pos < skim_pos);
}
