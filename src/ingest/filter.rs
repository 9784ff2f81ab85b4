// src/ingest/filter.rs
//! Quality filter + title dedup applied by each adapter before caching.
//!
//! - Quality (news only): title >= 20 chars, summary >= 50 chars, and no junk
//!   marker in either field (case-insensitive).
//! - Dedup: lowercased title truncated to 50 chars; first occurrence wins.
//!
//! Quality runs first so that a stub item cannot shadow a later good one.

use std::collections::HashSet;

use metrics::counter;

use crate::ingest::types::{ItemKind, NormalizedItem};

pub const MIN_TITLE_CHARS: usize = 20;
pub const MIN_SUMMARY_CHARS: usize = 50;
pub const DEDUP_KEY_CHARS: usize = 50;

/// Lowercase markers of removed, paywalled or boilerplate content.
pub const JUNK_MARKERS: &[&str] = &[
    "removed",
    "[removed]",
    "click here",
    "subscribe now",
    "read more",
    "unavailable",
];

pub fn dedup_key(title: &str) -> String {
    title.to_lowercase().chars().take(DEDUP_KEY_CHARS).collect()
}

fn contains_junk(text: &str) -> bool {
    let lower = text.to_lowercase();
    JUNK_MARKERS.iter().any(|m| lower.contains(m))
}

/// Research items always pass; news items must look like a real article.
pub fn passes_quality(item: &NormalizedItem) -> bool {
    if item.kind != ItemKind::News {
        return true;
    }
    if item.title.chars().count() < MIN_TITLE_CHARS
        || item.summary.chars().count() < MIN_SUMMARY_CHARS
    {
        return false;
    }
    !contains_junk(&item.title) && !contains_junk(&item.summary)
}

/// Keep the first item per dedup key, preserving input order.
/// Returns (kept, dropped_count).
pub fn dedup_by_title(items: Vec<NormalizedItem>) -> (Vec<NormalizedItem>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for it in items {
        if !seen.insert(dedup_key(&it.title)) {
            dropped += 1;
            continue;
        }
        keep.push(it);
    }
    (keep, dropped)
}

/// Quality filter, then dedup. Returns (kept, filtered_count, dedup_count).
pub fn filter_dedup(items: Vec<NormalizedItem>) -> (Vec<NormalizedItem>, usize, usize) {
    let before = items.len();
    let filtered: Vec<NormalizedItem> = items.into_iter().filter(passes_quality).collect();
    let filtered_out = before - filtered.len();
    let (kept, dedup_out) = dedup_by_title(filtered);

    counter!("digest_items_dropped_total", "reason" => "quality").increment(filtered_out as u64);
    counter!("digest_items_dropped_total", "reason" => "duplicate").increment(dedup_out as u64);

    (kept, filtered_out, dedup_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn news(title: &str, summary: &str) -> NormalizedItem {
        NormalizedItem {
            title: title.into(),
            summary: summary.into(),
            source: "Wire".into(),
            topic: "ai".into(),
            published_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            url: None,
            kind: ItemKind::News,
            authors: None,
        }
    }

    #[test]
    fn junk_markers_are_case_insensitive() {
        let s = "A perfectly normal summary that is long enough to pass the length check";
        assert!(passes_quality(&news("A long enough headline here", s)));
        assert!(!passes_quality(&news("[Removed] long enough headline", s)));
        assert!(!passes_quality(&news(
            "A long enough headline here",
            "This content is UNAVAILABLE in your region, sorry about that, truly"
        )));
        assert!(!passes_quality(&news(
            "Click Here for the big reveal",
            s
        )));
    }

    #[test]
    fn research_items_skip_quality_checks() {
        let mut it = news("Short", "Tiny");
        it.kind = ItemKind::Research;
        assert!(passes_quality(&it));
    }

    #[test]
    fn dedup_key_counts_chars_not_bytes() {
        let t = "é".repeat(60);
        assert_eq!(dedup_key(&t).chars().count(), 50);
    }

    #[test]
    fn filter_then_dedup_counts() {
        let s = "x".repeat(60);
        let items = vec![
            news("Short one", &s),
            news("Model release lifts chip stocks today", &s),
            news("MODEL RELEASE LIFTS CHIP STOCKS TODAY", &s),
            news("Another distinct headline about robots", &s),
        ];
        let (kept, filtered, dedup) = filter_dedup(items);
        assert_eq!(kept.len(), 2);
        assert_eq!(filtered, 1);
        assert_eq!(dedup, 1);
        assert_eq!(kept[0].title, "Model release lifts chip stocks today");
    }
}
