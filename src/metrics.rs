use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the cache freshness window
    /// as a static gauge.
    pub fn init(cache_freshness_secs: u64) -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;

        crate::ingest::ensure_metrics_described();
        gauge!("digest_cache_freshness_secs").set(cache_freshness_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
