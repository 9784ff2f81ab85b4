// src/config/settings.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";
pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";

/// Runtime knobs for the digest pipeline, loaded from `config/digest.toml`.
/// Every section is optional; missing fields fall back to the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub news: NewsSettings,
    pub research: ResearchSettings,
    pub fetch: FetchSettings,
    pub cache: CacheSettings,
    pub fallback: FallbackSettings,
    /// Re-run the digest for the configured topics every N seconds (0 = off).
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    /// "ENV" means: read from NEWS_API_KEY. Empty/absent means degraded mode.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub page_size: u32,
    pub max_topics: usize,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            api_key: Some("ENV".to_string()),
            endpoint: "https://newsapi.org/v2/everything".to_string(),
            page_size: 10,
            max_topics: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSettings {
    pub endpoint: String,
    pub max_results: u32,
    pub max_topics: usize,
    /// Optional override for the embedded topic expansion table.
    pub expansions_path: Option<PathBuf>,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://export.arxiv.org/api/query".to_string(),
            max_results: 10,
            max_topics: 3,
            expansions_path: None,
        }
    }
}

/// A relay (CORS proxy) prefix. The target URL is appended, percent-encoded
/// when `encode_target` is set.
///
/// The whole target URL, query string included, goes to the relay operator.
/// Credentials carried as query parameters (the news API `apiKey`) are
/// therefore visible to every relay tried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayPrefix {
    pub prefix: String,
    #[serde(default = "default_true")]
    pub encode_target: bool,
}

fn default_true() -> bool {
    true
}

impl RelayPrefix {
    pub fn new(prefix: &str, encode_target: bool) -> Self {
        Self {
            prefix: prefix.to_string(),
            encode_target,
        }
    }

    /// Build the relayed URL for `target`.
    pub fn wrap(&self, target: &str) -> String {
        if self.encode_target {
            let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
            format!("{}{}", self.prefix, encoded)
        } else {
            format!("{}{}", self.prefix, target)
        }
    }
}

/// Built-in relay list, tried in this order. These are public third-party
/// services; set `fetch.relays = []` to keep keyed requests direct-only.
pub fn default_relays() -> Vec<RelayPrefix> {
    vec![
        RelayPrefix::new("https://api.allorigins.win/raw?url=", true),
        RelayPrefix::new("https://corsproxy.io/?url=", true),
        RelayPrefix::new("https://api.codetabs.com/v1/proxy?quest=", true),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub direct_timeout_ms: u64,
    pub relay_timeout_ms: u64,
    pub round_pause_ms: u64,
    pub time_budget_ms: u64,
    pub relays: Vec<RelayPrefix>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            direct_timeout_ms: 10_000,
            relay_timeout_ms: 5_000,
            round_pause_ms: 500,
            time_budget_ms: 15_000,
            relays: default_relays(),
            user_agent: "topic-digest/0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub freshness_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            freshness_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    /// Use the RSS search source when the news adapter has no credential.
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://news.google.com/rss/search".to_string(),
        }
    }
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let cfg: Settings = toml::from_str(&data)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load settings using env var + fallbacks:
    /// 1) $DIGEST_CONFIG_PATH
    /// 2) config/digest.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default())
    }

    /// The news credential after "ENV" resolution. `None` means degraded mode.
    pub fn news_api_key(&self) -> Option<String> {
        let raw = self.news.api_key.as_deref()?.trim();
        let key = if raw.eq_ignore_ascii_case("env") {
            env::var(ENV_NEWS_API_KEY).ok()?
        } else {
            raw.to_string()
        };
        let key = key.trim().to_string();
        (!key.is_empty()).then_some(key)
    }

    // Zero timeouts or caps would turn every call into an instant failure.
    fn sanitized(mut self) -> Self {
        let d = FetchSettings::default();
        if self.fetch.direct_timeout_ms == 0 {
            self.fetch.direct_timeout_ms = d.direct_timeout_ms;
        }
        if self.fetch.relay_timeout_ms == 0 {
            self.fetch.relay_timeout_ms = d.relay_timeout_ms;
        }
        if self.fetch.time_budget_ms == 0 {
            self.fetch.time_budget_ms = d.time_budget_ms;
        }
        if self.news.max_topics == 0 {
            self.news.max_topics = NewsSettings::default().max_topics;
        }
        if self.research.max_topics == 0 {
            self.research.max_topics = ResearchSettings::default().max_topics;
        }
        if self.cache.freshness_secs == 0 {
            self.cache.freshness_secs = CacheSettings::default().freshness_secs;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_budgets() {
        let s = Settings::default();
        assert_eq!(s.fetch.direct_timeout_ms, 10_000);
        assert_eq!(s.fetch.relay_timeout_ms, 5_000);
        assert_eq!(s.fetch.round_pause_ms, 500);
        assert_eq!(s.fetch.time_budget_ms, 15_000);
        assert_eq!(s.news.max_topics, 5);
        assert_eq!(s.research.max_topics, 3);
        assert_eq!(s.cache.freshness_secs, 1800);
        assert_eq!(s.fetch.relays.len(), 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("digest.toml");
        fs::write(
            &p,
            r#"
refresh_interval_secs = 600

[news]
api_key = "abc123"
page_size = 20

[fetch]
time_budget_ms = 0
relays = [{ prefix = "https://relay.test/?u=" }]
"#,
        )
        .unwrap();
        let s = Settings::load_from_file(&p).unwrap();
        assert_eq!(s.refresh_interval_secs, 600);
        assert_eq!(s.news.page_size, 20);
        assert_eq!(s.news.max_topics, 5);
        assert_eq!(s.news_api_key().as_deref(), Some("abc123"));
        // zero budget is sanitized back to the default
        assert_eq!(s.fetch.time_budget_ms, 15_000);
        assert_eq!(s.fetch.relays.len(), 1);
        assert!(s.fetch.relays[0].encode_target);
    }

    #[test]
    fn empty_relay_list_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("digest.toml");
        fs::write(&p, "[fetch]\nrelays = []\n").unwrap();
        let s = Settings::load_from_file(&p).unwrap();
        assert!(s.fetch.relays.is_empty());
        assert!(FetchSettings::default().relays.iter().all(|r| r.encode_target));
    }

    #[test]
    fn blank_key_is_degraded_mode() {
        let mut s = Settings::default();
        s.news.api_key = Some("   ".into());
        assert!(s.news_api_key().is_none());
        s.news.api_key = None;
        assert!(s.news_api_key().is_none());
    }

    #[serial_test::serial]
    #[test]
    fn env_key_resolution() {
        let mut s = Settings::default();
        s.news.api_key = Some("ENV".into());
        env::remove_var(ENV_NEWS_API_KEY);
        assert!(s.news_api_key().is_none());
        env::set_var(ENV_NEWS_API_KEY, "k-from-env");
        assert_eq!(s.news_api_key().as_deref(), Some("k-from-env"));
        env::remove_var(ENV_NEWS_API_KEY);
    }

    #[test]
    fn relay_wrap_encodes_target() {
        let r = RelayPrefix::new("https://relay.test/raw?url=", true);
        assert_eq!(
            r.wrap("https://api.test/q?a=1&b=2"),
            "https://relay.test/raw?url=https%3A%2F%2Fapi.test%2Fq%3Fa%3D1%26b%3D2"
        );
        let raw = RelayPrefix::new("https://relay.test/", false);
        assert_eq!(raw.wrap("https://api.test/q"), "https://relay.test/https://api.test/q");
    }
}
