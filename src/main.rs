//! Topic Digest: binary entrypoint.
//! Boots the Axum HTTP server: settings, adapters, shared cache, optional
//! refresh scheduler and the Prometheus endpoint.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topic_digest::api::{self, AppState};
use topic_digest::config::Settings;
use topic_digest::ingest::cache::{ItemCache, DEFAULT_FRESHNESS_SECS};
use topic_digest::ingest::config::load_topics_default;
use topic_digest::ingest::fetcher::ReqwestTransport;
use topic_digest::ingest::scheduler::spawn_refresh_scheduler;
use topic_digest::ingest::Aggregator;
use topic_digest::metrics::Metrics;

/// Compact logs by default; JSON lines when DIGEST_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("topic_digest=info,warn"));

    let json = std::env::var("DIGEST_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    // Shuttle may have installed a subscriber already.
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::load_default().context("loading digest settings")?;
    let topics = load_topics_default().context("loading configured topics")?;
    tracing::info!(topics = ?topics, "configured topics loaded");

    // Recorder first, so metric descriptions land in the exporter.
    let metrics = match Metrics::init(settings.cache.freshness_secs) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed; /metrics disabled");
            None
        }
    };

    let transport = ReqwestTransport::new(&settings.fetch.user_agent)
        .context("building HTTP client")?;
    let freshness = i64::try_from(settings.cache.freshness_secs).unwrap_or(DEFAULT_FRESHNESS_SECS);
    let cache = Arc::new(ItemCache::new(freshness));
    let aggregator = Arc::new(
        Aggregator::from_settings(&settings, Arc::new(transport), cache.clone())
            .context("wiring source adapters")?,
    );

    if settings.refresh_interval_secs > 0 && !topics.is_empty() {
        let _refresh = spawn_refresh_scheduler(
            aggregator.clone(),
            cache,
            topics.clone(),
            Duration::from_secs(settings.refresh_interval_secs),
        );
    }

    let mut router = api::create_router(AppState::new(aggregator, topics));
    if let Some(m) = &metrics {
        router = router.merge(m.router());
    }

    Ok(router.into())
}
