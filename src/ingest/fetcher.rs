// src/ingest/fetcher.rs
//! Resilient GET: one direct attempt, then round-robin over relay prefixes
//! until a wall-clock budget runs out.
//!
//! - Direct attempt uses `direct_timeout` (10s default).
//! - Each relay attempt uses `relay_timeout` (5s default); a round stops at the
//!   first relay that answers 2xx.
//! - Between unsuccessful rounds we pause `round_pause` (500ms default).
//! - The first relay round always completes; later rounds check the deadline
//!   before every attempt, so overshoot is bounded by one relay timeout.
//!
//! Non-2xx, transport errors and timeouts are all treated the same way.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::settings::{FetchSettings, RelayPrefix};
use crate::error::FetchError;

/// Minimal HTTP seam so the fetch policy can be exercised without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`, returning the body of a 2xx response.
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Production transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .build()
            .map_err(|e| FetchError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        // without_url(): query strings may carry API keys.
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(timeout.as_millis() as u64)
                } else {
                    FetchError::Http(e.without_url().to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| FetchError::Http(e.without_url().to_string()))
    }
}

/// Timeouts, budget and relay list for one [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub direct_timeout: Duration,
    pub relay_timeout: Duration,
    pub round_pause: Duration,
    pub time_budget: Duration,
    pub relays: Vec<RelayPrefix>,
}

impl From<&FetchSettings> for FetchPolicy {
    fn from(s: &FetchSettings) -> Self {
        Self {
            direct_timeout: Duration::from_millis(s.direct_timeout_ms),
            relay_timeout: Duration::from_millis(s.relay_timeout_ms),
            round_pause: Duration::from_millis(s.round_pause_ms),
            time_budget: Duration::from_millis(s.time_budget_ms),
            relays: s.relays.clone(),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&FetchSettings::default())
    }
}

/// Cheap to clone; adapters share one instance.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: FetchPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: FetchPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Direct attempt only, for CORS-open providers.
    pub async fn fetch_direct(&self, target: &str) -> Result<String, FetchError> {
        self.attempt(target, self.policy.direct_timeout, "direct").await
    }

    /// Direct attempt, then relay rounds, bounded by the policy's time budget.
    pub async fn fetch(&self, target: &str) -> Result<String, FetchError> {
        self.fetch_with_budget(target, self.policy.time_budget).await
    }

    pub async fn fetch_with_budget(
        &self,
        target: &str,
        time_budget: Duration,
    ) -> Result<String, FetchError> {
        let started = Instant::now();
        let mut attempts: u32 = 1;

        match self.attempt(target, self.policy.direct_timeout, "direct").await {
            Ok(body) => return Ok(body),
            Err(e) => debug!(error = %e, "direct attempt failed; falling back to relays"),
        }

        let relays = &self.policy.relays;
        let mut round: u32 = 0;
        'rounds: while !relays.is_empty() {
            for (relay_idx, relay) in relays.iter().enumerate() {
                if round > 0 && started.elapsed() >= time_budget {
                    break 'rounds;
                }
                attempts += 1;
                match self
                    .attempt(&relay.wrap(target), self.policy.relay_timeout, "relay")
                    .await
                {
                    Ok(body) => {
                        debug!(round, relay_idx, "relay attempt succeeded");
                        return Ok(body);
                    }
                    Err(e) => debug!(round, relay_idx, error = %e, "relay attempt failed"),
                }
            }
            round += 1;
            if started.elapsed() >= time_budget {
                break;
            }
            tokio::time::sleep(self.policy.round_pause).await;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        counter!("digest_fetch_exhausted_total").increment(1);
        warn!(attempts, rounds = round, elapsed_ms, "fetch exhausted");
        Err(FetchError::Exhausted {
            attempts,
            elapsed_ms,
        })
    }

    async fn attempt(
        &self,
        url: &str,
        timeout: Duration,
        route: &'static str,
    ) -> Result<String, FetchError> {
        counter!("digest_fetch_attempts_total", "route" => route).increment(1);
        let t0 = Instant::now();
        // Outer timeout as well: a transport is not trusted to honor its own.
        let res = match tokio::time::timeout(timeout, self.transport.get(url, timeout)).await {
            Ok(r) => r,
            Err(_) => Err(FetchError::Timeout(timeout.as_millis() as u64)),
        };
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("digest_fetch_ms", "route" => route).record(ms);
        res
    }
}

// --- Test helper ---

/// Canned reply for [`StubTransport`].
#[derive(Debug, Clone)]
pub enum StubReply {
    Body(String),
    Status(u16),
    /// Never completes; exercises the per-attempt timeout.
    Hang,
}

/// In-memory transport: first route whose needle is a substring of the URL
/// wins; unmatched URLs fail with an HTTP error. Records every URL requested.
#[derive(Default)]
pub struct StubTransport {
    routes: Vec<(String, StubReply)>,
    calls: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, needle: &str, reply: StubReply) -> Self {
        self.routes.push((needle.to_string(), reply));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        match self.calls.lock() {
            Ok(mut g) => g.push(url.to_string()),
            Err(poison) => poison.into_inner().push(url.to_string()),
        }
        let reply = self
            .routes
            .iter()
            .find(|(needle, _)| url.contains(needle.as_str()))
            .map(|(_, r)| r.clone());
        match reply {
            Some(StubReply::Body(b)) => Ok(b),
            Some(StubReply::Status(code)) => Err(FetchError::Status(code)),
            Some(StubReply::Hang) => std::future::pending().await,
            None => Err(FetchError::Http(format!("no stub route for {url}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_with(relays: &[&str]) -> FetchPolicy {
        FetchPolicy {
            relays: relays.iter().map(|p| RelayPrefix::new(p, true)).collect(),
            ..FetchPolicy::default()
        }
    }

    #[tokio::test]
    async fn direct_success_skips_relays() {
        let stub =
            Arc::new(StubTransport::new().with_route("api.test", StubReply::Body("ok".into())));
        let f = Fetcher::new(stub.clone(), policy_with(&["https://relay-a.test/?u="]));
        let body = f.fetch("https://api.test/x").await.unwrap();
        assert_eq!(body, "ok");
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn non_2xx_falls_back_to_first_working_relay() {
        // relay-b first: relayed URLs also contain the encoded "api.test".
        let stub = Arc::new(
            StubTransport::new()
                .with_route("relay-b.test", StubReply::Body("via b".into()))
                .with_route("api.test", StubReply::Status(503)),
        );
        let f = Fetcher::new(
            stub.clone(),
            policy_with(&[
                "https://relay-a.test/?u=",
                "https://relay-b.test/?u=",
                "https://relay-c.test/?u=",
            ]),
        );
        let body = f.fetch("https://api.test/x").await.unwrap();
        assert_eq!(body, "via b");

        let calls = stub.calls();
        assert_eq!(calls.len(), 3, "direct, relay-a, relay-b; relay-c never tried");
        assert_eq!(calls[0], "https://api.test/x");
        assert!(calls[1].starts_with("https://relay-a.test/?u=https%3A%2F%2Fapi.test"));
        assert!(calls[2].starts_with("https://relay-b.test/"));
    }

    #[tokio::test(start_paused = true)]
    async fn no_relays_fails_right_after_direct() {
        let stub = Arc::new(StubTransport::new());
        let f = Fetcher::new(stub.clone(), policy_with(&[]));
        let err = f.fetch("https://api.test/x").await.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_direct_times_out() {
        let stub = Arc::new(StubTransport::new().with_route("", StubReply::Hang));
        let f = Fetcher::new(stub, FetchPolicy::default());
        let t0 = Instant::now();
        let err = f.fetch_direct("https://api.test/x").await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(10_000)));
        assert!(t0.elapsed() >= Duration::from_secs(10));
    }
}
