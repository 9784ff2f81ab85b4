// tests/ranking.rs
use chrono::{Duration, TimeZone, Utc};
use topic_digest::relevance::{rank_at, score_item};
use topic_digest::{ItemKind, NormalizedItem};

fn item(title: &str, summary: &str, kind: ItemKind, age_days: i64) -> NormalizedItem {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    NormalizedItem {
        title: title.to_string(),
        summary: summary.to_string(),
        source: "src".to_string(),
        topic: "t".to_string(),
        published_at: now - Duration::days(age_days),
        url: None,
        kind,
        authors: None,
    }
}

#[test]
fn two_matches_research_recent_beats_one_match_news_old() {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    let topics = vec!["computer vision".to_string(), "AI safety".to_string()];

    let a = item(
        "AI safety for computer vision",
        "Benchmarks for robust perception models.",
        ItemKind::Research,
        3,
    );
    let b = item(
        "Startups chase computer vision deals",
        "Funding rounds keep growing.",
        ItemKind::News,
        10,
    );

    assert_eq!(score_item(&a, &topics, now), 28);
    assert_eq!(score_item(&b, &topics, now), 10);

    let ranked = rank_at(vec![b.clone(), a.clone()], &topics, now);
    assert_eq!(ranked, vec![a, b]);
}

#[test]
fn empty_input_ranks_to_empty() {
    let now = Utc::now();
    assert!(rank_at(Vec::new(), &["x".to_string()], now).is_empty());
}
