// src/ingest/providers/arxiv.rs
//! arXiv research adapter.
//!
//! The arXiv API is CORS-open, so each topic is one direct request (no relay
//! rounds). Queries OR together the topic's expansion terms; entries missing a
//! title or summary are dropped. `source` is the first known institution named
//! in the entry text, else "arXiv".

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

use crate::config::Settings;
use crate::error::FetchError;
use crate::ingest::cache::ItemCache;
use crate::ingest::expansion::TopicExpansions;
use crate::ingest::fetcher::Fetcher;
use crate::ingest::types::{ItemKind, NormalizedItem, SourceProvider};
use crate::ingest::{cap_topics, clean_text, run_cached, truncate_chars};

pub const PROVIDER: &str = "arxiv";
pub const DEFAULT_SOURCE: &str = "arXiv";
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Known labs/institutions, most specific first.
pub const KNOWN_INSTITUTIONS: &[&str] = &[
    "Google DeepMind",
    "DeepMind",
    "Google Research",
    "OpenAI",
    "Anthropic",
    "Meta AI",
    "Microsoft Research",
    "NVIDIA",
    "IBM Research",
    "Allen Institute",
    "Stanford",
    "MIT",
    "Carnegie Mellon",
    "UC Berkeley",
    "Oxford",
    "Cambridge",
    "ETH Zurich",
    "Tsinghua",
    "Mila",
    "Max Planck",
];

// Word-bounded and case-insensitive, so "MIT" matches "mit" but not "limit".
static INSTITUTION_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    KNOWN_INSTITUTIONS
        .iter()
        .filter_map(|name| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))
                .ok()
                .map(|re| (*name, re))
        })
        .collect()
});

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

pub struct ArxivProvider {
    endpoint: String,
    max_results: u32,
    max_topics: usize,
    expansions: TopicExpansions,
    fetcher: Fetcher,
    cache: Arc<ItemCache>,
}

impl ArxivProvider {
    pub fn new(
        settings: &Settings,
        expansions: TopicExpansions,
        fetcher: Fetcher,
        cache: Arc<ItemCache>,
    ) -> Self {
        Self {
            endpoint: settings.research.endpoint.clone(),
            max_results: settings.research.max_results,
            max_topics: settings.research.max_topics,
            expansions,
            fetcher,
            cache,
        }
    }

    /// `all:"term1" OR all:"term2" ...` over the topic's expansion terms.
    pub fn build_query(&self, topic: &str) -> String {
        self.expansions
            .expand(topic)
            .iter()
            .map(|t| format!(r#"all:"{}""#, t.replace('"', "")))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    fn topic_url(&self, topic: &str) -> Result<String, FetchError> {
        let max_results = self.max_results.to_string();
        url::Url::parse_with_params(
            &self.endpoint,
            &[
                ("search_query", self.build_query(topic).as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ],
        )
        .map(|u| u.to_string())
        .map_err(|e| FetchError::Parse(format!("invalid research endpoint: {e}")))
    }

    async fn fetch_topic(&self, topic: String) -> Result<Vec<NormalizedItem>, FetchError> {
        let url = self.topic_url(&topic)?;
        let body = self.fetcher.fetch_direct(&url).await?;
        parse_feed(&body, &topic)
    }
}

/// First known institution named in `text`, else [`DEFAULT_SOURCE`].
pub fn attribute_source(text: &str) -> String {
    INSTITUTION_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(name, _)| (*name).to_string())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string())
}

/// Parse an Atom feed into research items.
pub fn parse_feed(xml: &str, topic: &str) -> Result<Vec<NormalizedItem>, FetchError> {
    let feed: Feed = from_str(xml).map_err(|e| FetchError::Parse(format!("arxiv atom: {e}")))?;

    let mut out = Vec::with_capacity(feed.entries.len());
    for e in feed.entries {
        let title = clean_text(e.title.as_deref().unwrap_or_default());
        let summary = clean_text(e.summary.as_deref().unwrap_or_default());
        if title.is_empty() || summary.is_empty() {
            continue;
        }

        let names: Vec<String> = e
            .authors
            .iter()
            .filter_map(|a| a.name.as_deref())
            .map(clean_text)
            .filter(|n| !n.is_empty())
            .collect();
        let authors = (!names.is_empty()).then(|| names.join(", "));

        let source = attribute_source(&format!(
            "{} {} {}",
            title,
            summary,
            authors.as_deref().unwrap_or_default()
        ));

        let url = e
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .and_then(|l| l.href.clone())
            .or(e.id);

        out.push(NormalizedItem {
            title,
            summary: truncate_chars(&summary, MAX_SUMMARY_CHARS),
            source,
            topic: topic.to_string(),
            published_at: e
                .published
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts.trim()).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default(),
            url,
            kind: ItemKind::Research,
            authors,
        });
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for ArxivProvider {
    async fn fetch_topics(&self, topics: &[String]) -> Vec<NormalizedItem> {
        let topics = cap_topics(topics, self.max_topics);
        run_cached(PROVIDER, &self.cache, topics, |topic| self.fetch_topic(topic)).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
