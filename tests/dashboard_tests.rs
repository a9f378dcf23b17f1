//! Dashboard aggregation tests over records as they come out of the store.
//!
//! Unit tests in `analytics::dashboard` cover the arithmetic on hand-built
//! records; these go through `AnalysisRecord::from_json` and `HistoryStore`
//! the way the CLI and the web server do.

use chrono::{Duration, Local, TimeZone};
use govdoc::analytics::dashboard::{
    ComplianceTier, DEFAULT_PROCESSING_TIME_SECS, RECENT_LIMIT, compute_stats,
};
use govdoc::history::{HistoryStore, MemoryStorage};
use govdoc::records::AnalysisRecord;
use serde_json::{Value, json};

fn record(id: &str, raw: Value) -> AnalysisRecord {
    AnalysisRecord::from_json(id, &raw).unwrap()
}

fn with_decision(id: &str, decision: Option<&str>) -> AnalysisRecord {
    match decision {
        Some(d) => record(id, json!({ "analysis": { "decision": d } })),
        None => record(id, json!({})),
    }
}

#[test]
fn bucket_counts_hold_for_any_mix() {
    let now = Local::now();
    for a in 0..4 {
        for b in 0..3 {
            for c in 0..3 {
                for u in 0..3 {
                    let mut records = Vec::new();
                    records.extend((0..a).map(|i| with_decision(&format!("a{i}"), Some("APPROVE"))));
                    records.extend(
                        (0..b).map(|i| with_decision(&format!("b{i}"), Some("NEEDS MORE DOCUMENTS"))),
                    );
                    records.extend((0..c).map(|i| with_decision(&format!("c{i}"), Some("REJECT"))));
                    records.extend((0..u).map(|i| {
                        let decision = if i % 2 == 0 { None } else { Some("approve") };
                        with_decision(&format!("u{i}"), decision)
                    }));

                    let stats = compute_stats(&records, now);
                    assert_eq!(stats.total, a + b + c + u);
                    assert_eq!(stats.approved, a);
                    assert_eq!(stats.needs_review, b);
                    assert_eq!(stats.rejected, c);
                    assert_eq!(stats.unclassified(), u);
                }
            }
        }
    }
}

#[test]
fn legacy_paths_feed_the_same_statistics() {
    let now = Local::now();
    let records = vec![
        record(
            "new",
            json!({ "analysis": { "decision": "APPROVE" }, "compliance_score": 80 }),
        ),
        record(
            "old",
            json!({
                "ai_analysis": { "decision": "APPROVE" },
                "validation_results": { "completeness": { "score": 60 } }
            }),
        ),
    ];
    let stats = compute_stats(&records, now);
    assert_eq!(stats.approved, 2);
    assert_eq!(stats.avg_compliance_score, 70.0);
    assert_eq!(stats.compliance_tier(), ComplianceTier::Good);
}

#[test]
fn ten_record_example_gives_sixty_percent() {
    let mut history = HistoryStore::new(MemoryStorage::new());
    let decisions = [
        Some("APPROVE"),
        Some("APPROVE"),
        Some("REJECT"),
        Some("APPROVE"),
        Some("NEEDS MORE DOCUMENTS"),
        Some("APPROVE"),
        None,
        Some("REJECT"),
        Some("APPROVE"),
        Some("APPROVE"),
    ];
    for (i, decision) in decisions.iter().enumerate() {
        let raw = match decision {
            Some(d) => json!({ "success": true, "analysis": { "decision": d } }),
            None => json!({ "success": true }),
        };
        history.put_with_id(&format!("{i:03}"), &raw).unwrap();
    }

    let stats = compute_stats(&history.list().unwrap(), Local::now());
    assert_eq!(stats.total, 10);
    assert_eq!(stats.approved, 6);
    assert_eq!(stats.rejected, 2);
    assert_eq!(stats.needs_review, 1);
    assert!((stats.success_rate() - 60.0).abs() < 1e-9);
    assert!((stats.rejection_rate() - 20.0).abs() < 1e-9);
    assert!((stats.review_rate() - 10.0).abs() < 1e-9);
}

#[test]
fn recent_is_newest_first_and_capped() {
    let base = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let records: Vec<AnalysisRecord> = (0..8)
        .map(|i| {
            let ts = (base + Duration::hours(i)).to_rfc3339();
            record(
                &format!("s{i}"),
                json!({ "timestamp": ts, "extracted_data": { "company_name": format!("Co {i}") } }),
            )
        })
        .collect();

    let stats = compute_stats(&records, base + Duration::days(1));
    assert_eq!(stats.recent.len(), RECENT_LIMIT);
    let ids: Vec<&str> = stats.recent.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["s7", "s6", "s5", "s4", "s3"]);
    assert_eq!(stats.recent[0].company, "Co 7");
    assert_eq!(stats.recent[0].date, "2024-06-01");
    assert_eq!(stats.recent[0].time, "19:00:00");
}

#[test]
fn corrupt_entries_do_not_zero_the_dashboard() {
    use govdoc::history::KeyValueStorage;

    let mut backend = MemoryStorage::new();
    backend
        .set(
            "govdoc_results_1",
            &json!({ "analysis": { "decision": "REJECT" }, "analysis_time": 3.0 }).to_string(),
        )
        .unwrap();
    backend.set("govdoc_results_2", "{{{").unwrap();
    let history = HistoryStore::new(backend);

    let stats = compute_stats(&history.list().unwrap(), Local::now());
    assert_eq!(stats.total, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.avg_processing_time, 3.0);
}

#[test]
fn empty_history_gives_defaults() {
    let history = HistoryStore::new(MemoryStorage::new());
    let stats = compute_stats(&history.list().unwrap(), Local::now());
    assert_eq!(stats.total, 0);
    assert_eq!(stats.success_rate(), 0.0);
    assert_eq!(stats.avg_compliance_score, 0.0);
    assert_eq!(stats.avg_processing_time, DEFAULT_PROCESSING_TIME_SECS);
    assert!(stats.recent.is_empty());
}
