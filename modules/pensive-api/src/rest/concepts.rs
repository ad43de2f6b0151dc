use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;

use crate::rest::user_id_from_headers;
use crate::AppState;

const DEFAULT_ABSTRACTION_LEVEL: u8 = 50;

#[derive(Deserialize)]
pub struct MapQuery {
    abstraction_level: Option<u8>,
    search: Option<String>,
}

pub async fn api_concept_map(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<MapQuery>,
) -> impl IntoResponse {
    let user = match user_id_from_headers(&headers) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let level = params
        .abstraction_level
        .unwrap_or(DEFAULT_ABSTRACTION_LEVEL)
        .min(100);

    match state
        .concept_maps
        .build_concept_map(user, level, params.search.as_deref())
        .await
    {
        Ok(map) => Json(map).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to build concept map");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
