// src/relevance.rs
//! Relevance ranking for the merged digest.
//!
//! This is a hand-tuned heuristic, not a calibrated relevance model. The
//! weights are kept as-is for behavioural compatibility:
//!
//! | signal                                            | points |
//! |---------------------------------------------------|--------|
//! | each topic found (case-insensitive) in title+summary | 10  |
//! | research item                                     | 5      |
//! | published within the last 7 days                  | 3      |
//!
//! Items are ordered by score (desc), then `published_at` (desc). The sort is
//! stable, so fully tied items keep their merge order. Ranking only reorders;
//! items are never modified.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::ingest::types::{ItemKind, NormalizedItem};

pub const TOPIC_MATCH_POINTS: u32 = 10;
pub const RESEARCH_POINTS: u32 = 5;
pub const RECENCY_POINTS: u32 = 3;
pub const RECENCY_WINDOW_DAYS: i64 = 7;

/// Score breakdown for one item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relevance {
    pub score: u32,
    /// Topics (as given) found in the item text.
    pub matched: Vec<String>,
    pub recent: bool,
}

/// Lowercased, trimmed, non-empty topics.
fn topic_needles(topics: &[String]) -> Vec<(String, String)> {
    topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| (t.to_string(), t.to_lowercase()))
        .collect()
}

fn evaluate_with(
    item: &NormalizedItem,
    needles: &[(String, String)],
    now: DateTime<Utc>,
) -> Relevance {
    let haystack = item.haystack().to_lowercase();

    let matched: Vec<String> = needles
        .iter()
        .filter(|(_, lower)| haystack.contains(lower.as_str()))
        .map(|(orig, _)| orig.clone())
        .collect();

    // Future-dated items count as recent.
    let recent = item.published_at >= now - Duration::days(RECENCY_WINDOW_DAYS);

    let mut score = TOPIC_MATCH_POINTS * matched.len() as u32;
    if item.kind == ItemKind::Research {
        score += RESEARCH_POINTS;
    }
    if recent {
        score += RECENCY_POINTS;
    }

    Relevance {
        score,
        matched,
        recent,
    }
}

/// Score breakdown for `item` against `topics` at instant `now`.
pub fn evaluate(item: &NormalizedItem, topics: &[String], now: DateTime<Utc>) -> Relevance {
    evaluate_with(item, &topic_needles(topics), now)
}

pub fn score_item(item: &NormalizedItem, topics: &[String], now: DateTime<Utc>) -> u32 {
    evaluate(item, topics, now).score
}

/// Rank against an explicit `now` (deterministic; used by tests).
pub fn rank_at(
    items: Vec<NormalizedItem>,
    topics: &[String],
    now: DateTime<Utc>,
) -> Vec<NormalizedItem> {
    let needles = topic_needles(topics);
    let mut scored: Vec<(u32, NormalizedItem)> = items
        .into_iter()
        .map(|it| (evaluate_with(&it, &needles, now).score, it))
        .collect();

    // Vec::sort_by is stable.
    scored.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa).then_with(|| b.published_at.cmp(&a.published_at))
    });

    if let Some((top, it)) = scored.first() {
        debug!(
            target: "relevance",
            items = scored.len(),
            top_score = *top,
            top_title = %it.title,
            "ranked"
        );
    }
    scored.into_iter().map(|(_, it)| it).collect()
}

/// Rank best-first against the current instant.
pub fn rank(items: Vec<NormalizedItem>, topics: &[String]) -> Vec<NormalizedItem> {
    rank_at(items, topics, Utc::now())
}
