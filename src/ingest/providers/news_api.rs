// src/ingest/providers/news_api.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::Settings;
use crate::error::FetchError;
use crate::ingest::cache::ItemCache;
use crate::ingest::fetcher::Fetcher;
use crate::ingest::types::{ItemKind, NormalizedItem, SourceProvider};
use crate::ingest::{cap_topics, clean_text, run_cached, truncate_chars};

pub const PROVIDER: &str = "newsapi";
pub const MAX_SUMMARY_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// NewsAPI-compatible `everything` search. Without an API key the provider is
/// in degraded mode: it returns nothing and never touches the network.
pub struct NewsApiProvider {
    api_key: Option<String>,
    endpoint: String,
    page_size: u32,
    max_topics: usize,
    fetcher: Fetcher,
    cache: Arc<ItemCache>,
}

impl NewsApiProvider {
    pub fn new(settings: &Settings, fetcher: Fetcher, cache: Arc<ItemCache>) -> Self {
        Self {
            api_key: settings.news_api_key(),
            endpoint: settings.news.endpoint.clone(),
            page_size: settings.news.page_size,
            max_topics: settings.news.max_topics,
            fetcher,
            cache,
        }
    }

    /// `"<topic>" AND (AI OR "artificial intelligence" OR ...)`
    pub fn build_query(topic: &str) -> String {
        format!(
            r#""{}" AND (AI OR "artificial intelligence" OR "machine learning" OR "deep learning")"#,
            topic.trim()
        )
    }

    fn topic_url(&self, topic: &str, api_key: &str) -> Result<String, FetchError> {
        let page_size = self.page_size.to_string();
        url::Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", Self::build_query(topic).as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
            ],
        )
        .map(|u| u.to_string())
        .map_err(|e| FetchError::Parse(format!("invalid news endpoint: {e}")))
    }

    async fn fetch_topic(
        &self,
        topic: String,
        api_key: &str,
    ) -> Result<Vec<NormalizedItem>, FetchError> {
        let url = self.topic_url(&topic, api_key)?;
        let body = self.fetcher.fetch(&url).await?;
        parse_articles(&body, &topic)
    }
}

/// Map a NewsAPI JSON body to news items. Articles without a title or
/// description are dropped individually.
pub fn parse_articles(body: &str, topic: &str) -> Result<Vec<NormalizedItem>, FetchError> {
    let resp: NewsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("newsapi json: {e}")))?;
    if resp.status.as_deref() == Some("error") {
        return Err(FetchError::Parse(format!(
            "newsapi error: {}",
            resp.message.unwrap_or_default()
        )));
    }

    let mut out = Vec::with_capacity(resp.articles.len());
    for a in resp.articles {
        let title = clean_text(a.title.as_deref().unwrap_or_default());
        let summary = clean_text(a.description.as_deref().unwrap_or_default());
        if title.is_empty() || summary.is_empty() {
            continue;
        }
        let source = a
            .source
            .and_then(|s| s.name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "NewsAPI".to_string());

        out.push(NormalizedItem {
            title,
            summary: truncate_chars(&summary, MAX_SUMMARY_CHARS),
            source,
            topic: topic.to_string(),
            published_at: a
                .published_at
                .as_deref()
                .and_then(parse_rfc3339)
                .unwrap_or_default(),
            url: a.url.filter(|u| !u.is_empty()),
            kind: ItemKind::News,
            authors: None,
        });
    }
    Ok(out)
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts).ok().map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl SourceProvider for NewsApiProvider {
    async fn fetch_topics(&self, topics: &[String]) -> Vec<NormalizedItem> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Vec::new();
        };
        let topics = cap_topics(topics, self.max_topics);
        run_cached(PROVIDER, &self.cache, topics, |topic| self.fetch_topic(topic, api_key)).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
