// tests/quality_filter.rs
use chrono::{TimeZone, Utc};
use topic_digest::ingest::filter::{filter_dedup, passes_quality};
use topic_digest::{ItemKind, NormalizedItem};

fn news(title: &str, summary: &str) -> NormalizedItem {
    NormalizedItem {
        title: title.to_string(),
        summary: summary.to_string(),
        source: "Wire".to_string(),
        topic: "robotics".to_string(),
        published_at: Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap(),
        url: None,
        kind: ItemKind::News,
        authors: None,
    }
}

#[test]
fn length_thresholds_are_inclusive() {
    let short_title = news(&"t".repeat(19), &"s".repeat(200));
    let at_limits = news(&"t".repeat(20), &"s".repeat(50));
    let short_summary = news(&"t".repeat(40), &"s".repeat(49));

    assert!(!passes_quality(&short_title));
    assert!(passes_quality(&at_limits));
    assert!(!passes_quality(&short_summary));
}

#[test]
fn junk_markers_drop_news_but_not_research() {
    let body = "x".repeat(60);
    assert!(!passes_quality(&news("This article was [Removed] by the site", &body)));
    assert!(!passes_quality(&news(
        "A perfectly ordinary headline here",
        &format!("{body} Click HERE")
    )));

    let mut paper = news("Tiny", "short");
    paper.kind = ItemKind::Research;
    assert!(passes_quality(&paper));
}

#[test]
fn dedup_uses_first_fifty_chars_case_insensitively() {
    let prefix = "Robots Learn To Fold Laundry With A Single Demo Now";
    assert!(prefix.chars().count() >= 50);
    let body = "y".repeat(60);

    let a = news(&format!("{prefix} (part one)"), &body);
    let b = news(&format!("{} (part two)", prefix.to_uppercase()), &body);
    let c = news("An entirely different headline on robotics", &body);
    let junk = news("tiny", &body);

    let (kept, filtered, dedup) = filter_dedup(vec![a.clone(), junk, b, c.clone()]);
    assert_eq!(kept, vec![a, c]);
    assert_eq!(filtered, 1);
    assert_eq!(dedup, 1);
}
