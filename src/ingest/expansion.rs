// src/ingest/expansion.rs
//! Topic → research query expansion.
//!
//! The table is data, not code: `config/topic_expansions.toml` is embedded as
//! the default and can be swapped via `research.expansions_path`. Topics with
//! no table entry get a synthesized expansion (topic, its words, a few
//! AI-domain variants), capped at [`MAX_EXPANSION_TERMS`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const MAX_EXPANSION_TERMS: usize = 8;

const EMBEDDED_TABLE: &str = include_str!("../../config/topic_expansions.toml");

const DOMAIN_PREFIXES: &[&str] = &["deep learning", "neural"];
const DOMAIN_SUFFIXES: &[&str] = &["machine learning", "AI"];

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Expansion {
    pub name: String,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicExpansions {
    #[serde(default, rename = "topic")]
    entries: Vec<Expansion>,
}

impl TopicExpansions {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut table: TopicExpansions = toml::from_str(s).context("parsing topic expansions")?;
        for e in table.entries.iter_mut() {
            e.name = normalize_topic(&e.name);
            e.terms.retain(|t| !t.trim().is_empty());
        }
        table.entries.retain(|e| !e.name.is_empty() && !e.terms.is_empty());
        Ok(table)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading topic expansions from {}", path.display()))?;
        Self::from_toml_str(&s)
    }

    /// The table shipped with the crate.
    pub fn embedded() -> Self {
        // The embedded asset is covered by tests; an empty table only means
        // every topic takes the synthesized path.
        Self::from_toml_str(EMBEDDED_TABLE).unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "embedded topic expansions unreadable");
            Self::default()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Table entry whose name contains, or is contained in, the topic.
    pub fn lookup(&self, topic: &str) -> Option<&Expansion> {
        let t = normalize_topic(topic);
        if t.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.name.contains(&t) || t.contains(&e.name))
    }

    /// Expansion terms for `topic`, never more than [`MAX_EXPANSION_TERMS`].
    pub fn expand(&self, topic: &str) -> Vec<String> {
        let mut terms = match self.lookup(topic) {
            Some(e) => e.terms.clone(),
            None => synthesize(topic),
        };
        terms.truncate(MAX_EXPANSION_TERMS);
        terms
    }
}

pub fn normalize_topic(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// topic, its significant words, then prefix/suffix variants; distinct, capped.
fn synthesize(topic: &str) -> Vec<String> {
    let topic = topic.split_whitespace().collect::<Vec<_>>().join(" ");
    if topic.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<String> = Vec::with_capacity(MAX_EXPANSION_TERMS);
    let mut push = |term: String| {
        if out.len() < MAX_EXPANSION_TERMS
            && !out.iter().any(|t| t.eq_ignore_ascii_case(&term))
        {
            out.push(term);
        }
    };

    push(topic.clone());
    let words: Vec<&str> = topic.split(' ').collect();
    if words.len() > 1 {
        for w in words.iter().filter(|w| w.chars().count() > 3) {
            push((*w).to_string());
        }
    }
    for p in DOMAIN_PREFIXES {
        push(format!("{p} {topic}"));
    }
    for s in DOMAIN_SUFFIXES {
        push(format!("{topic} {s}"));
    }
    out
}
