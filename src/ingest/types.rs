// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which adapter produced an item. Fixed at normalization time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    News,
    Research,
}

/// Common post-adapter shape for news articles and research papers.
/// Items are never mutated after an adapter builds them; ranking only reorders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedItem {
    pub title: String,
    pub summary: String,
    pub source: String, // provider or institution, e.g. "Reuters", "DeepMind", "arXiv"
    pub topic: String,  // the topic string whose query produced this item
    pub published_at: DateTime<Utc>,
    pub url: Option<String>,
    pub kind: ItemKind,
    pub authors: Option<String>, // research only
}

impl NormalizedItem {
    /// `title + " " + summary`, the text the ranker matches topics against.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

/// A source adapter turns a topic list into normalized items.
///
/// Adapters never fail: per-topic errors are logged and skipped, and a
/// missing credential yields an empty list.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_topics(&self, topics: &[String]) -> Vec<NormalizedItem>;
    fn name(&self) -> &'static str;

    /// False when the adapter runs in degraded mode (e.g. no API key) and the
    /// caller should look for a substitute source.
    fn is_configured(&self) -> bool {
        true
    }
}
