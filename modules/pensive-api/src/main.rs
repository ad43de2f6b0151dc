use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pensive_analyzer::Analyzer;
use pensive_common::Config;
use pensive_digest::DigestGenerator;
use pensive_feeds::{FeedPoller, HttpPageFetcher, MockPageFetcher, PageFetcher};
use pensive_graph::ConceptMapService;
use pensive_store::{ConceptStore, ContentStore, DigestStore, FeedStore, JobQueue};

mod auth;
mod rest;

/// Every component the handlers need, constructed once at startup and
/// passed by reference. No global singletons.
pub struct AppState {
    pub content: ContentStore,
    pub concepts: ConceptStore,
    pub feeds: FeedStore,
    pub digest_store: DigestStore,
    pub jobs: JobQueue,
    pub analyzer: Analyzer,
    pub concept_maps: ConceptMapService,
    pub digests: DigestGenerator,
    pub poller: FeedPoller,
    pub fetcher: Arc<dyn PageFetcher>,
    pub cron_secret: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pensive=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = pensive_store::connect(&config.database_url).await?;
    pensive_store::migrate(&pool).await?;

    let content = ContentStore::new(pool.clone());
    let concepts = ConceptStore::new(pool.clone());

    // Demo mode (no API key) swaps in the mock fetcher alongside the mock
    // analyzer, so the whole pipeline runs without outbound calls.
    let fetcher: Arc<dyn PageFetcher> = if config.demo_mode() {
        info!("Demo mode: no ANTHROPIC_API_KEY set, using mock analyzer and fetcher");
        Arc::new(MockPageFetcher)
    } else {
        Arc::new(HttpPageFetcher::new())
    };

    let state = Arc::new(AppState {
        analyzer: Analyzer::new(config.anthropic_api_key.as_deref()),
        concept_maps: ConceptMapService::new(concepts.clone()),
        digests: DigestGenerator::new(content.clone(), DigestStore::new(pool.clone())),
        digest_store: DigestStore::new(pool.clone()),
        feeds: FeedStore::new(pool.clone()),
        jobs: JobQueue::new(pool.clone()),
        poller: FeedPoller::new(),
        fetcher,
        content,
        concepts,
        cron_secret: config.cron_secret,
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Content pipeline
        .route("/api/content/analyze", post(rest::content::api_analyze))
        .route("/api/content", get(rest::content::api_list_content))
        .route("/api/content/search", get(rest::content::api_search_content))
        .route(
            "/api/content/{id}",
            axum::routing::delete(rest::content::api_delete_content),
        )
        // Concept graph
        .route("/api/concepts/map", get(rest::concepts::api_concept_map))
        // Digests
        .route("/api/digest", post(rest::digests::api_generate_digest))
        .route("/api/digest/render", post(rest::digests::api_render_digest))
        .route("/api/digests", get(rest::digests::api_list_digests))
        // Feeds
        .route(
            "/api/feeds",
            get(rest::feeds::api_list_feeds).post(rest::feeds::api_subscribe_feed),
        )
        // Scheduled work (bearer-gated)
        .route("/cron/process-feeds", get(rest::cron::cron_process_feeds))
        .route("/cron/send-digests", post(rest::cron::cron_send_digests))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.app_host, config.app_port);
    info!("Pensive API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
