//! Error types for upstream fetches.
//!
//! Only the fetch layer has a typed error: everything above it (adapters, the
//! aggregate pipeline) degrades to "no items" instead of failing. Messages
//! never include API keys; URLs are logged by callers after redaction.

/// Errors that can occur while fetching a single upstream document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The direct attempt and every relay round failed within the time budget.
    #[error("fetch exhausted after {attempts} attempts in {elapsed_ms}ms")]
    Exhausted { attempts: u32, elapsed_ms: u64 },

    /// A single attempt did not complete within its per-attempt timeout.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// The upstream (or relay) answered with a non-2xx status.
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// Transport-level failure (DNS, TLS, connection reset, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The body arrived but could not be parsed into the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// True for the terminal "no data for this call" outcome.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchError::Exhausted { .. })
    }
}
