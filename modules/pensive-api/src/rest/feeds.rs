use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::rest::{user_id_from_headers, validate_url};
use crate::AppState;

#[derive(Deserialize)]
pub struct SubscribeRequest {
    url: Option<String>,
    title: Option<String>,
}

pub async fn api_subscribe_feed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SubscribeRequest>,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let url = match validate_url(body.url.as_deref().unwrap_or_default()) {
        Ok(url) => url,
        Err(resp) => return resp,
    };

    match state
        .feeds
        .subscribe(user, &url, body.title.as_deref())
        .await
    {
        Ok(feed) => {
            info!(%user, url, "Feed subscribed");
            (StatusCode::CREATED, Json(serde_json::json!({ "feed": feed }))).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to subscribe feed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_list_feeds(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.feeds.list_for_user(user).await {
        Ok(feeds) => Json(serde_json::json!({ "feeds": feeds })).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list feeds");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
