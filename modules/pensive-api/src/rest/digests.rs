use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;

use pensive_common::{Priority, Timeframe};
use pensive_digest::{DigestError, DigestItem};

use crate::rest::{error_json, user_id_from_headers};
use crate::AppState;

#[derive(Deserialize)]
pub struct GenerateRequest {
    timeframe: Option<String>,
}

#[derive(Deserialize)]
pub struct RenderRequest {
    timeframe: Option<String>,
    #[serde(default)]
    content: Vec<RenderItem>,
}

#[derive(Deserialize)]
pub struct RenderItem {
    title: String,
    url: String,
    priority: Option<String>,
    summary: Option<String>,
}

fn parse_timeframe(raw: Option<&str>) -> Result<Timeframe, axum::response::Response> {
    match raw {
        None => Ok(Timeframe::Weekly),
        Some(raw) => Timeframe::parse(raw)
            .ok_or_else(|| error_json(StatusCode::BAD_REQUEST, "Unknown timeframe")),
    }
}

/// Generate and persist a digest for the acting user. An empty window is an
/// empty-state condition, not a server error.
pub async fn api_generate_digest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let timeframe = match parse_timeframe(body.timeframe.as_deref()) {
        Ok(timeframe) => timeframe,
        Err(resp) => return resp,
    };

    match state.digests.generate_digest(user, timeframe).await {
        Ok(digest) => Json(serde_json::json!({ "digest": digest })).into_response(),
        Err(DigestError::NoContent) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "No content in the requested timeframe",
                "timeframe": timeframe.as_str(),
            })),
        )
            .into_response(),
        Err(DigestError::Store(e)) => {
            warn!(error = %e, "Failed to generate digest");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Render a digest fragment from caller-supplied items. Nothing is stored.
pub async fn api_render_digest(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RenderRequest>,
) -> impl IntoResponse {
    let timeframe = match parse_timeframe(body.timeframe.as_deref()) {
        Ok(timeframe) => timeframe,
        Err(resp) => return resp,
    };

    let items: Vec<DigestItem> = body
        .content
        .into_iter()
        .map(|item| DigestItem {
            title: item.title,
            url: item.url,
            priority: item
                .priority
                .as_deref()
                .and_then(Priority::parse)
                .unwrap_or(Priority::Read),
            summary: item.summary.unwrap_or_default(),
        })
        .collect();

    let html = state.digests.render_only(timeframe, &items);

    Json(serde_json::json!({
        "success": true,
        "content": html,
        "item_count": items.len(),
    }))
    .into_response()
}

pub async fn api_list_digests(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.digest_store.list_for_user(user, 20).await {
        Ok(digests) => Json(serde_json::json!({ "digests": digests })).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list digests");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
