// src/ingest/mod.rs
pub mod cache;
pub mod config;
pub mod expansion;
pub mod fetcher;
pub mod filter;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::FetchError;
use crate::ingest::cache::{CacheKey, ItemCache};
use crate::ingest::expansion::TopicExpansions;
use crate::ingest::fetcher::{FetchPolicy, Fetcher, Transport};
use crate::ingest::providers::{
    arxiv::ArxivProvider, google_news_rss::GoogleNewsRssProvider, news_api::NewsApiProvider,
};
use crate::ingest::types::{NormalizedItem, SourceProvider};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_fetch_attempts_total",
            "HTTP attempts issued by the fetcher, by route (direct/relay)."
        );
        describe_counter!(
            "digest_fetch_exhausted_total",
            "Fetches that ran out of time budget across direct + relays."
        );
        describe_histogram!("digest_fetch_ms", "Per-attempt latency in milliseconds.");
        describe_counter!("digest_cache_hits_total", "Adapter cache hits.");
        describe_counter!("digest_cache_misses_total", "Adapter cache misses (incl. expired).");
        describe_gauge!("digest_cache_entries", "Entries currently held in the cache.");
        describe_counter!(
            "digest_items_dropped_total",
            "Items dropped by the quality filter or dedup."
        );
        describe_counter!("digest_items_kept_total", "Items kept per provider run.");
        describe_counter!("digest_topic_errors_total", "Topics skipped after fetch/parse errors.");
        describe_counter!("digest_runs_total", "Aggregate digest runs.");
    });
}

/// Normalize upstream text: decode entities, strip tags, fold typographic
/// quotes, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    if let Ok(re_tags) = RE_TAGS.get_or_try_init(|| regex::Regex::new(r"(?is)</?[^>]+>")) {
        out = re_tags.replace_all(&out, " ").to_string();
    }

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Char-safe truncation; appends "..." when something was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Trim topics, drop empty ones, keep the first `max`.
pub fn cap_topics(topics: &[String], max: usize) -> Vec<String> {
    topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Cache-first, sequential per-topic run shared by every adapter.
///
/// A failed topic is logged and skipped. The filtered/deduplicated result is
/// cached only when at least one topic call succeeded, so a total outage is
/// retried on the next call instead of pinning an empty result.
pub(crate) async fn run_cached<F, Fut>(
    provider: &'static str,
    cache: &ItemCache,
    topics: Vec<String>,
    mut fetch_topic: F,
) -> Vec<NormalizedItem>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<NormalizedItem>, FetchError>>,
{
    let key = CacheKey::new(provider, &topics);
    if let Some(hit) = cache.get(&key) {
        debug!(provider, count = hit.len(), "served from cache");
        return hit;
    }

    let mut raw = Vec::new();
    let mut any_ok = false;
    for topic in topics {
        match fetch_topic(topic.clone()).await {
            Ok(mut items) => {
                any_ok = true;
                debug!(provider, topic = %topic, count = items.len(), "topic fetched");
                raw.append(&mut items);
            }
            Err(e) => {
                warn!(provider, topic = %topic, error = %e, "topic skipped");
                counter!("digest_topic_errors_total", "provider" => provider).increment(1);
            }
        }
    }

    let (kept, filtered, dedup) = filter::filter_dedup(raw);
    counter!("digest_items_kept_total", "provider" => provider).increment(kept.len() as u64);
    info!(
        target: "ingest",
        provider,
        kept = kept.len(),
        filtered,
        dedup,
        "adapter run finished"
    );

    if any_ok {
        cache.put(key, kept.clone());
    }
    kept
}

/// Top-level fetch → merge → rank pipeline over the news and research adapters.
pub struct Aggregator {
    news: Arc<dyn SourceProvider>,
    research: Arc<dyn SourceProvider>,
    news_fallback: Option<Arc<dyn SourceProvider>>,
}

impl Aggregator {
    pub fn new(news: Arc<dyn SourceProvider>, research: Arc<dyn SourceProvider>) -> Self {
        Self {
            news,
            research,
            news_fallback: None,
        }
    }

    /// Substitute news source used while the primary one is unconfigured.
    pub fn with_news_fallback(mut self, fallback: Arc<dyn SourceProvider>) -> Self {
        self.news_fallback = Some(fallback);
        self
    }

    /// Wire the production adapters from settings around one shared fetcher
    /// and cache.
    pub fn from_settings(
        settings: &Settings,
        transport: Arc<dyn Transport>,
        cache: Arc<ItemCache>,
    ) -> Result<Self> {
        ensure_metrics_described();

        let fetcher = Fetcher::new(transport, FetchPolicy::from(&settings.fetch));
        let expansions = match &settings.research.expansions_path {
            Some(p) => TopicExpansions::load_from_file(p)?,
            None => TopicExpansions::embedded(),
        };

        let news = NewsApiProvider::new(settings, fetcher.clone(), cache.clone());
        if !news.is_configured() {
            info!("no news API key configured; news adapter runs in degraded mode");
        }
        let research = ArxivProvider::new(settings, expansions, fetcher.clone(), cache.clone());

        let mut agg = Self::new(Arc::new(news), Arc::new(research));
        if settings.fallback.enabled {
            let rss = GoogleNewsRssProvider::new(settings, fetcher, cache);
            agg = agg.with_news_fallback(Arc::new(rss));
        }
        Ok(agg)
    }

    fn active_news(&self) -> &Arc<dyn SourceProvider> {
        match &self.news_fallback {
            Some(fb) if !self.news.is_configured() => fb,
            _ => &self.news,
        }
    }

    /// Run both adapters concurrently and return the ranked union.
    /// Never fails: total upstream failure yields an empty list.
    pub async fn collect(&self, topics: &[String]) -> Vec<NormalizedItem> {
        let topics: Vec<String> = cap_topics(topics, usize::MAX);
        if topics.is_empty() {
            return Vec::new();
        }

        let news = self.active_news();
        let (mut items, research) = tokio::join!(
            news.fetch_topics(&topics),
            self.research.fetch_topics(&topics)
        );
        let news_count = items.len();
        let research_count = research.len();
        items.extend(research);

        let ranked = crate::relevance::rank(items, &topics);
        counter!("digest_runs_total").increment(1);
        info!(
            target: "ingest",
            news_provider = news.name(),
            news = news_count,
            research = research_count,
            "digest collected"
        );
        ranked
    }
}
