// Scheduled endpoints, gated by the cron bearer secret. Each invocation
// does one bounded pass: poll due feeds (enqueueing analyze jobs for new
// items), or fan out digest jobs, then drain the queue inline.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use pensive_common::{ContentSource, Timeframe};
use pensive_digest::DigestError;
use pensive_feeds::FeedPollOutcome;
use pensive_store::{Job, JobType, NewContent};

use crate::auth::require_cron_auth;
use crate::AppState;

/// How long one drained job may run before its lease expires.
const JOB_LEASE: Duration = Duration::from_secs(120);

/// Fixed delay before a nacked job is retried.
const JOB_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Bound on feeds polled and jobs drained per cron invocation.
const FEEDS_PER_RUN: i64 = 50;
const JOBS_PER_RUN: usize = 200;

#[derive(Deserialize)]
struct AnalyzePayload {
    user_id: Uuid,
    content_id: Uuid,
}

#[derive(Deserialize)]
struct DigestPayload {
    user_id: Uuid,
    timeframe: String,
}

/// GET /cron/process-feeds: poll every due feed, store new items (dedup
/// applies), enqueue analyze jobs, then drain the queue.
pub async fn cron_process_feeds(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(resp) = require_cron_auth(&headers, &state.cron_secret) {
        return resp;
    }

    let feeds = match state.feeds.due_feeds(FEEDS_PER_RUN).await {
        Ok(feeds) => feeds,
        Err(e) => {
            warn!(error = %e, "Failed to load due feeds");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut summaries = Vec::with_capacity(feeds.len());
    for feed in feeds {
        let summary = process_one_feed(&state, &feed).await;
        summaries.push(summary);
    }

    let job_results = drain_jobs(&state).await;

    Json(serde_json::json!({
        "feeds": summaries,
        "jobs": job_results,
    }))
    .into_response()
}

/// POST /cron/send-digests: enqueue a weekly digest job per active user,
/// then drain the queue and report per-user results.
pub async fn cron_send_digests(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(resp) = require_cron_auth(&headers, &state.cron_secret) {
        return resp;
    }

    let cutoff = Timeframe::Weekly.cutoff(Utc::now());
    let users = match state.content.users_with_content_since(cutoff).await {
        Ok(users) => users,
        Err(e) => {
            warn!(error = %e, "Failed to load users for digests");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    for user in &users {
        let payload = serde_json::json!({
            "user_id": user,
            "timeframe": Timeframe::Weekly.as_str(),
        });
        if let Err(e) = state.jobs.enqueue(JobType::GenerateDigest, payload, 3).await {
            warn!(%user, error = %e, "Failed to enqueue digest job");
        }
    }

    let job_results = drain_jobs(&state).await;

    Json(serde_json::json!({
        "users": users.len(),
        "jobs": job_results,
    }))
    .into_response()
}

async fn process_one_feed(state: &AppState, feed: &pensive_store::Feed) -> serde_json::Value {
    match state.poller.poll(feed).await {
        Ok(FeedPollOutcome::Unchanged) => {
            if let Err(e) = state
                .feeds
                .record_success(feed.id, None, None, None, None)
                .await
            {
                warn!(feed_url = %feed.url, error = %e, "Failed to record feed poll");
            }
            serde_json::json!({"feed": feed.url, "status": "unchanged"})
        }
        Ok(FeedPollOutcome::Fetched {
            title,
            etag,
            last_modified,
            items,
        }) => {
            let latest = items.iter().filter_map(|i| i.published_at).max();
            let mut new_items = 0u32;

            for item in &items {
                let page = match state.fetcher.fetch(&item.url).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(item_url = %item.url, error = %e, "Skipping unfetchable feed item");
                        continue;
                    }
                };
                let item_title = item
                    .title
                    .clone()
                    .or(page.title)
                    .unwrap_or_else(|| item.url.clone());

                let stored = match state
                    .content
                    .store_content(
                        feed.user_id,
                        NewContent {
                            title: item_title,
                            url: item.url.clone(),
                            text: page.text,
                            source: ContentSource::Rss,
                        },
                    )
                    .await
                {
                    Ok(stored) => stored,
                    Err(e) => {
                        warn!(item_url = %item.url, error = %e, "Failed to store feed item");
                        continue;
                    }
                };

                if stored.is_new {
                    let payload = serde_json::json!({
                        "user_id": feed.user_id,
                        "content_id": stored.content_id,
                    });
                    if let Err(e) = state
                        .jobs
                        .enqueue(JobType::AnalyzeContent, payload, 3)
                        .await
                    {
                        warn!(error = %e, "Failed to enqueue analyze job");
                    } else {
                        new_items += 1;
                    }
                }
            }

            if let Err(e) = state
                .feeds
                .record_success(
                    feed.id,
                    title.as_deref(),
                    etag.as_deref(),
                    last_modified.as_deref(),
                    latest,
                )
                .await
            {
                warn!(feed_url = %feed.url, error = %e, "Failed to record feed poll");
            }

            info!(feed_url = %feed.url, new_items, "Feed processed");
            serde_json::json!({"feed": feed.url, "status": "fetched", "new_items": new_items})
        }
        Err(e) => {
            let error = e.to_string();
            match state.feeds.record_failure(feed.id, &error).await {
                Ok(updated) => serde_json::json!({
                    "feed": feed.url,
                    "status": "error",
                    "error": error,
                    "is_active": updated.is_active,
                }),
                Err(store_err) => {
                    warn!(feed_url = %feed.url, error = %store_err, "Failed to record feed failure");
                    serde_json::json!({"feed": feed.url, "status": "error", "error": error})
                }
            }
        }
    }
}

/// Drain the job queue: reap expired leases, then claim and run jobs until
/// the queue is empty or the per-run bound is hit.
async fn drain_jobs(state: &AppState) -> Vec<serde_json::Value> {
    if let Err(e) = state.jobs.reap_expired().await {
        warn!(error = %e, "Failed to reap expired job leases");
    }

    let mut results = Vec::new();
    for _ in 0..JOBS_PER_RUN {
        let job = match state.jobs.dequeue(JOB_LEASE).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to dequeue job");
                break;
            }
        };

        let outcome = run_job(state, &job).await;
        let result = match outcome {
            Ok(detail) => {
                if let Err(e) = state.jobs.ack(job.id).await {
                    warn!(job_id = %job.id, error = %e, "Failed to ack job");
                }
                serde_json::json!({
                    "job_id": job.id,
                    "type": job.job_type,
                    "status": "completed",
                    "detail": detail,
                })
            }
            Err(error) => {
                let status = state
                    .jobs
                    .nack(job.id, &error, JOB_RETRY_DELAY)
                    .await
                    .map(|s| s.as_str())
                    .unwrap_or("failed");
                serde_json::json!({
                    "job_id": job.id,
                    "type": job.job_type,
                    "status": status,
                    "error": error,
                })
            }
        };
        results.push(result);
    }
    results
}

/// Run one claimed job. Returns a human-readable detail on success and the
/// error message to record on failure.
async fn run_job(state: &AppState, job: &Job) -> Result<String, String> {
    match job.job_type() {
        Some(JobType::AnalyzeContent) => run_analyze_job(state, job).await,
        Some(JobType::GenerateDigest) => run_digest_job(state, job).await,
        Some(JobType::FetchFeed) | Some(JobType::SendEmail) | None => {
            Err(format!("Unsupported job type: {}", job.job_type))
        }
    }
}

async fn run_analyze_job(state: &AppState, job: &Job) -> Result<String, String> {
    let payload: AnalyzePayload = serde_json::from_value(job.payload.clone())
        .map_err(|e| format!("Bad analyze payload: {e}"))?;

    let item = state
        .content
        .get(payload.user_id, payload.content_id)
        .await
        .map_err(|e| format!("Failed to load content: {e}"))?
        .ok_or_else(|| format!("Content {} not found", payload.content_id))?;

    // Already analyzed (by a concurrent run or an earlier attempt): done.
    let existing = state
        .content
        .current_analysis(item.id)
        .await
        .map_err(|e| format!("Failed to check analysis: {e}"))?;
    if existing.is_some() {
        return Ok("already analyzed".to_string());
    }

    let analyzed = state
        .analyzer
        .analyze(&item.title, &item.raw_text, &item.url)
        .await;

    state
        .content
        .insert_analysis(item.id, &analyzed.analysis)
        .await
        .map_err(|e| format!("Failed to persist analysis: {e}"))?;

    if let Err(e) = state
        .concepts
        .record_entities(payload.user_id, &analyzed.analysis.entities)
        .await
    {
        warn!(error = %e, "Failed to record entities");
    } else if let Err(e) = state
        .concepts
        .record_relationships(payload.user_id, item.id, &analyzed.analysis.relationships)
        .await
    {
        warn!(error = %e, "Failed to record relationships");
    }
    state.concept_maps.invalidate_user(payload.user_id);

    Ok("analyzed".to_string())
}

async fn run_digest_job(state: &AppState, job: &Job) -> Result<String, String> {
    let payload: DigestPayload = serde_json::from_value(job.payload.clone())
        .map_err(|e| format!("Bad digest payload: {e}"))?;
    let timeframe = Timeframe::parse(&payload.timeframe)
        .ok_or_else(|| format!("Unknown timeframe: {}", payload.timeframe))?;

    match state
        .digests
        .generate_digest(payload.user_id, timeframe)
        .await
    {
        Ok(digest) => {
            // Delivery is out of scope; the digest is marked sent once it is
            // handed off.
            if let Err(e) = state.digest_store.mark_sent(digest.id).await {
                warn!(digest_id = %digest.id, error = %e, "Failed to mark digest sent");
            }
            Ok(format!("digest {}", digest.id))
        }
        // An empty window is a normal outcome, not a retryable failure.
        Err(DigestError::NoContent) => Ok("no content".to_string()),
        Err(DigestError::Store(e)) => Err(format!("Failed to generate digest: {e}")),
    }
}
