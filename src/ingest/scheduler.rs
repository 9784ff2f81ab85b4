// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use tokio::task::JoinHandle;

use crate::ingest::cache::ItemCache;
use crate::ingest::Aggregator;

/// Re-run the digest for `topics` every `interval` to keep the adapter caches
/// warm. Stale entries for other topic sets are purged on each tick. The first
/// run happens immediately.
pub fn spawn_refresh_scheduler(
    aggregator: Arc<Aggregator>,
    cache: Arc<ItemCache>,
    topics: Vec<String>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = cache.purge_stale(chrono::Utc::now());
            let items = aggregator.collect(&topics).await;
            let now = chrono::Utc::now().timestamp().max(0);
            gauge!("digest_last_refresh_ts").set(now as f64);
            tracing::info!(
                target: "ingest",
                topics = topics.len(),
                items = items.len(),
                purged,
                cached = cache.len(),
                "scheduled refresh"
            );
        }
    })
}
