// src/ingest/providers/mod.rs
pub mod arxiv;
pub mod google_news_rss;
pub mod news_api;
