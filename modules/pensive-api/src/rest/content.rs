use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;

use pensive_common::{ContentSource, Priority, Timeframe};
use pensive_store::{ContentQuery, NewContent};

use crate::rest::{error_json, user_id_from_headers, validate_url};
use crate::AppState;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    url: Option<String>,
    title: Option<String>,
    text: Option<String>,
    source: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    source: Option<String>,
    priority: Option<String>,
    timeframe: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

/// The full ingest pipeline for one URL: fetch (unless text is supplied),
/// dedup-store, analyze, persist the analysis, fold entities into the
/// concept graph. Duplicate submissions short-circuit before any LLM spend.
pub async fn api_analyze(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let url = match validate_url(body.url.as_deref().unwrap_or_default()) {
        Ok(url) => url,
        Err(resp) => return resp,
    };
    let source = match &body.source {
        None => ContentSource::Web,
        Some(raw) => match ContentSource::parse(raw) {
            Some(source) => source,
            None => return error_json(StatusCode::BAD_REQUEST, "Unknown source"),
        },
    };

    // Supplied text wins; otherwise the fetch is part of the request and a
    // fetch failure is this endpoint's failure.
    let (title, text) = match body.text.filter(|t| !t.trim().is_empty()) {
        Some(text) => (body.title.unwrap_or_else(|| url.clone()), text),
        None => match state.fetcher.fetch(&url).await {
            Ok(page) => (
                body.title.or(page.title).unwrap_or_else(|| url.clone()),
                page.text,
            ),
            Err(e) => {
                warn!(url, error = %e, "Failed to fetch URL for analysis");
                return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch URL");
            }
        },
    };

    let stored = match state
        .content
        .store_content(
            user,
            NewContent {
                title: title.clone(),
                url: url.clone(),
                text: text.clone(),
                source,
            },
        )
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            warn!(error = %e, "Failed to store content");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !stored.is_new {
        // Known fingerprint: reuse the stored analysis, never re-charge the LLM.
        match state.content.current_analysis(stored.content_id).await {
            Ok(Some(record)) => {
                return Json(serde_json::json!({
                    "content_id": stored.content_id,
                    "analysis": record,
                    "is_new": false,
                    "cached": true,
                }))
                .into_response();
            }
            Ok(None) => {} // stored previously but never analyzed; analyze now
            Err(e) => {
                warn!(error = %e, "Failed to load existing analysis");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    let analyzed = state.analyzer.analyze(&title, &text, &url).await;

    let record = match state
        .content
        .insert_analysis(stored.content_id, &analyzed.analysis)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Failed to persist analysis");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Concept aggregation is derived state; failures degrade the graph, not
    // the request.
    if let Err(e) = state
        .concepts
        .record_entities(user, &analyzed.analysis.entities)
        .await
    {
        warn!(error = %e, "Failed to record entities");
    } else if let Err(e) = state
        .concepts
        .record_relationships(user, stored.content_id, &analyzed.analysis.relationships)
        .await
    {
        warn!(error = %e, "Failed to record relationships");
    }
    state.concept_maps.invalidate_user(user);

    Json(serde_json::json!({
        "content_id": stored.content_id,
        "analysis": record,
        "is_new": stored.is_new,
        "cached": analyzed.cached,
    }))
    .into_response()
}

pub async fn api_list_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListQuery>,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let source = match params.source.as_deref() {
        None => None,
        Some(raw) => match ContentSource::parse(raw) {
            Some(source) => Some(source),
            None => return error_json(StatusCode::BAD_REQUEST, "Unknown source"),
        },
    };
    let priority = match params.priority.as_deref() {
        None => None,
        Some(raw) => match Priority::parse(raw) {
            Some(priority) => Some(priority),
            None => return error_json(StatusCode::BAD_REQUEST, "Unknown priority"),
        },
    };
    let timeframe = match params.timeframe.as_deref() {
        None => None,
        Some(raw) => match Timeframe::parse(raw) {
            Some(timeframe) => Some(timeframe),
            None => return error_json(StatusCode::BAD_REQUEST, "Unknown timeframe"),
        },
    };

    let query = ContentQuery {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(20),
        source,
        priority,
        timeframe,
    };

    match state.content.get_user_content(user, query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list content");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_delete_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    axum::extract::Path(id): axum::extract::Path<uuid::Uuid>,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.content.delete(user, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_json(StatusCode::NOT_FOUND, "Content not found"),
        Err(e) => {
            warn!(error = %e, "Failed to delete content");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_search_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchQuery>,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return error_json(StatusCode::BAD_REQUEST, "q is required");
    };

    match state.content.search(user, q).await {
        Ok(items) => Json(serde_json::json!({ "items": items })).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to search content");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
