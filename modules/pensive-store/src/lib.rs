//! Postgres persistence for Pensive: content items, versioned analyses,
//! concepts and their relationships, feed subscriptions, digests, and the
//! job queue.

pub mod concepts;
pub mod content;
pub mod digests;
pub mod error;
pub mod feeds;
pub mod jobs;

pub use concepts::{Concept, ConceptRelationship, ConceptStore};
pub use content::{
    AnalysisRecord, AnalyzedContent, ContentItem, ContentPage, ContentQuery, ContentStore,
    NewContent, StoredContent,
};
pub use digests::{DigestRecord, DigestStore};
pub use error::{Result, StoreError};
pub use feeds::{Feed, FeedStore, FEED_MAX_ERRORS};
pub use jobs::{Job, JobQueue, JobStatus, JobType};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres with a small, bounded pool.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
