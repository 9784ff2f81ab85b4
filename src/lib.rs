// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod relevance;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState, DigestResponse};
pub use crate::error::FetchError;
pub use crate::ingest::types::{ItemKind, NormalizedItem, SourceProvider};
pub use crate::ingest::Aggregator;
pub use crate::relevance::rank;
