// src/ingest/providers/google_news_rss.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::config::Settings;
use crate::error::FetchError;
use crate::ingest::cache::ItemCache;
use crate::ingest::fetcher::Fetcher;
use crate::ingest::types::{ItemKind, NormalizedItem, SourceProvider};
use crate::ingest::{cap_topics, clean_text, run_cached, truncate_chars};

pub const PROVIDER: &str = "google-news-rss";
pub const MAX_SUMMARY_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text", default)]
    name: String,
}

// `time` first; chrono also accepts the obsolete zone names ("GMT", "EST").
fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .or_else(|| {
            DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Keyless substitute news source (Google News RSS search), used while the
/// primary news API has no credential. Goes through the relay-backed fetch.
pub struct GoogleNewsRssProvider {
    endpoint: String,
    max_topics: usize,
    fetcher: Fetcher,
    cache: Arc<ItemCache>,
}

impl GoogleNewsRssProvider {
    pub fn new(settings: &Settings, fetcher: Fetcher, cache: Arc<ItemCache>) -> Self {
        Self {
            endpoint: settings.fallback.endpoint.clone(),
            max_topics: settings.news.max_topics,
            fetcher,
            cache,
        }
    }

    fn topic_url(&self, topic: &str) -> Result<String, FetchError> {
        let q = format!(r#""{}" AI"#, topic.trim());
        url::Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", q.as_str()),
                ("hl", "en-US"),
                ("gl", "US"),
                ("ceid", "US:en"),
            ],
        )
        .map(|u| u.to_string())
        .map_err(|e| FetchError::Parse(format!("invalid rss endpoint: {e}")))
    }

    async fn fetch_topic(&self, topic: String) -> Result<Vec<NormalizedItem>, FetchError> {
        let url = self.topic_url(&topic)?;
        let body = self.fetcher.fetch(&url).await?;
        parse_items(&body, &topic)
    }
}

/// Parse an RSS 2.0 search feed into news items.
pub fn parse_items(xml: &str, topic: &str) -> Result<Vec<NormalizedItem>, FetchError> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Parse(format!("rss xml: {e}")))?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let publisher = it
            .source
            .map(|s| clean_text(&s.name))
            .filter(|s| !s.is_empty());

        let mut title = clean_text(it.title.as_deref().unwrap_or_default());
        // Search feeds append " - Publisher" to every headline.
        if let Some(p) = publisher.as_deref() {
            if let Some(stripped) = title.strip_suffix(&format!(" - {p}")) {
                title = stripped.trim_end().to_string();
            }
        }
        let summary = clean_text(it.description.as_deref().unwrap_or_default());
        if title.is_empty() || summary.is_empty() {
            continue;
        }

        out.push(NormalizedItem {
            title,
            summary: truncate_chars(&summary, MAX_SUMMARY_CHARS),
            source: publisher.unwrap_or_else(|| "Google News".to_string()),
            topic: topic.to_string(),
            published_at: it
                .pub_date
                .as_deref()
                .and_then(parse_rfc2822)
                .unwrap_or_default(),
            url: it.link,
            kind: ItemKind::News,
            authors: None,
        });
    }
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[async_trait]
impl SourceProvider for GoogleNewsRssProvider {
    async fn fetch_topics(&self, topics: &[String]) -> Vec<NormalizedItem> {
        let topics = cap_topics(topics, self.max_topics);
        run_cached(PROVIDER, &self.cache, topics, |topic| self.fetch_topic(topic)).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2822_dates_parse() {
        let dt = parse_rfc2822("Tue, 14 Oct 2025 08:30:00 GMT").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-10-14T08:30:00+00:00");
        assert!(parse_rfc2822("yesterday").is_none());
    }

    #[test]
    fn publisher_suffix_is_stripped() {
        let xml = r##"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>"robotics" AI - Google News</title>
  <item>
    <title>Warehouse robots get a new brain - TechWire</title>
    <link>https://news.test/a</link>
    <pubDate>Tue, 14 Oct 2025 08:30:00 GMT</pubDate>
    <description>&lt;a href="https://news.test/a"&gt;Warehouse robots get a new brain&lt;/a&gt;&amp;nbsp;&amp;nbsp;&lt;font color="#6f6f6f"&gt;TechWire&lt;/font&gt;</description>
    <source url="https://techwire.test">TechWire</source>
  </item>
</channel></rss>"##;
        let items = parse_items(xml, "robotics").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Warehouse robots get a new brain");
        assert_eq!(items[0].source, "TechWire");
        assert_eq!(items[0].summary, "Warehouse robots get a new brain TechWire");
        assert_eq!(items[0].kind, ItemKind::News);
    }
}
