use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ingest::config::clean_topics;
use crate::ingest::types::NormalizedItem;
use crate::ingest::Aggregator;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Topics served by `GET /digest`.
    pub default_topics: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, default_topics: Vec<String>) -> Self {
        Self {
            aggregator,
            default_topics: Arc::new(default_topics),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/digest", get(digest_default).post(digest_for_topics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct DigestReq {
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct DigestResponse {
    pub topics: Vec<String>,
    pub count: usize,
    pub items: Vec<NormalizedItem>,
}

async fn run_digest(state: &AppState, topics: Vec<String>) -> DigestResponse {
    let items = state.aggregator.collect(&topics).await;
    if items.is_empty() {
        tracing::info!(topics = ?topics, "no results for these topics");
    }
    DigestResponse {
        count: items.len(),
        topics,
        items,
    }
}

async fn digest_default(State(state): State<AppState>) -> Json<DigestResponse> {
    let topics = state.default_topics.as_ref().clone();
    Json(run_digest(&state, topics).await)
}

async fn digest_for_topics(
    State(state): State<AppState>,
    Json(body): Json<DigestReq>,
) -> Json<DigestResponse> {
    let topics = clean_topics(body.topics);
    Json(run_digest(&state, topics).await)
}
