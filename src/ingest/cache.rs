// src/ingest/cache.rs
//! Time-boxed memo of adapter results.
//!
//! Keyed by (source id, sorted normalized topic set) so that topic order does
//! not fragment the cache. Entries are fresh for `freshness` after `put`; a
//! stale entry is discarded on read and reported as a miss. There is no
//! capacity bound: topic sets are few and the cache lives for the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};

use crate::ingest::types::NormalizedItem;

pub const DEFAULT_FRESHNESS_SECS: i64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: String,
    topics: String,
}

impl CacheKey {
    /// Topics are trimmed and lowercased, then sorted and joined with `|`.
    pub fn new(source: &str, topics: &[String]) -> Self {
        let mut norm: Vec<String> = topics
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        norm.sort();
        norm.dedup();
        Self {
            source: source.to_string(),
            topics: norm.join("|"),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn topics(&self) -> &str {
        &self.topics
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub items: Vec<NormalizedItem>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ItemCache {
    inner: Mutex<HashMap<CacheKey, CacheEntry>>,
    freshness: Duration,
}

impl Default for ItemCache {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_SECS)
    }
}

impl ItemCache {
    pub fn new(freshness_secs: i64) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            freshness: Duration::seconds(freshness_secs.max(1)),
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Vec<NormalizedItem>> {
        self.get_at(key, Utc::now())
    }

    /// Look up `key` as of `now`. Stale entries are removed.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Vec<NormalizedItem>> {
        let mut map = self.lock();
        let fresh = match map.get(key) {
            Some(entry) => now - entry.fetched_at < self.freshness,
            None => {
                counter!("digest_cache_misses_total", "source" => key.source.clone()).increment(1);
                return None;
            }
        };
        if !fresh {
            map.remove(key);
            gauge!("digest_cache_entries").set(map.len() as f64);
            counter!("digest_cache_misses_total", "source" => key.source.clone()).increment(1);
            tracing::debug!(source = %key.source, "cache entry expired");
            return None;
        }
        counter!("digest_cache_hits_total", "source" => key.source.clone()).increment(1);
        map.get(key).map(|e| e.items.clone())
    }

    pub fn put(&self, key: CacheKey, items: Vec<NormalizedItem>) {
        self.put_at(key, items, Utc::now());
    }

    /// Store `items` under `key` as of `now`, first dropping every entry
    /// already stale at that instant.
    pub fn put_at(&self, key: CacheKey, items: Vec<NormalizedItem>, now: DateTime<Utc>) {
        let mut map = self.lock();
        let freshness = self.freshness;
        map.retain(|_, e| now - e.fetched_at < freshness);
        map.insert(
            key,
            CacheEntry {
                items,
                fetched_at: now,
            },
        );
        gauge!("digest_cache_entries").set(map.len() as f64);
    }

    /// Drop every entry that is stale as of `now`. Returns how many were removed.
    pub fn purge_stale(&self, now: DateTime<Utc>) -> usize {
        let mut map = self.lock();
        let before = map.len();
        let freshness = self.freshness;
        map.retain(|_, e| now - e.fetched_at < freshness);
        gauge!("digest_cache_entries").set(map.len() as f64);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
