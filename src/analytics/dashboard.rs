//! Dashboard aggregator: statistics over the analysis history.
//!
//! [`compute_stats`] is a pure function of the records and a reference
//! time. The reference time stands in for records that carry no timestamp,
//! which keeps the result deterministic under test.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::records::{AnalysisRecord, PENDING_LABEL, Verdict};

/// Number of entries in [`DashboardStats::recent`].
pub const RECENT_LIMIT: usize = 5;

/// Processing time assumed for records that do not report one, and the
/// figure shown for an empty history. Kept for compatibility with existing
/// dashboards; it is not a measured baseline.
pub const DEFAULT_PROCESSING_TIME_SECS: f64 = 5.2;

/// Display label for records without an extracted company name.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

// ---------------------------------------------------------------------------
// Aggregated stats
// ---------------------------------------------------------------------------

/// Summary statistics for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub approved: usize,
    pub needs_review: usize,
    pub rejected: usize,
    pub avg_compliance_score: f64,
    pub avg_processing_time: f64,
    pub recent: Vec<RecentAnalysis>,
}

/// Display projection of one recent analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAnalysis {
    pub id: String,
    pub company: String,
    pub decision: String,
    pub score: f64,
    pub date: String,
    pub time: String,
    pub documents: u64,
}

/// Coarse reading of the average compliance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceTier {
    Excellent,
    Good,
    NeedsImprovement,
}

impl ComplianceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Self::Excellent
        } else if score >= 60.0 {
            Self::Good
        } else {
            Self::NeedsImprovement
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent average compliance rate",
            Self::Good => "Good average compliance rate",
            Self::NeedsImprovement => "Compliance needs improvement",
        }
    }
}

impl DashboardStats {
    /// Records with no recognized decision.
    pub fn unclassified(&self) -> usize {
        self.total - self.approved - self.needs_review - self.rejected
    }

    /// Percentage of `count` over all records, 0.0 for an empty history.
    pub fn pct(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (count as f64 / self.total as f64) * 100.0
        }
    }

    pub fn success_rate(&self) -> f64 {
        self.pct(self.approved)
    }

    pub fn review_rate(&self) -> f64 {
        self.pct(self.needs_review)
    }

    pub fn rejection_rate(&self) -> f64 {
        self.pct(self.rejected)
    }

    pub fn compliance_tier(&self) -> ComplianceTier {
        ComplianceTier::from_score(self.avg_compliance_score)
    }
}

// ---------------------------------------------------------------------------
// Stats computation
// ---------------------------------------------------------------------------

/// Compute dashboard statistics using the wall clock for undated records.
pub fn compute_stats_now(records: &[AnalysisRecord]) -> DashboardStats {
    compute_stats(records, Local::now())
}

/// Compute dashboard statistics.
///
/// Every record counts toward `total`, including duplicates and records
/// without a recognized decision. Averages divide by `total`: a missing
/// score contributes 0 and a missing processing time contributes
/// [`DEFAULT_PROCESSING_TIME_SECS`].
pub fn compute_stats(records: &[AnalysisRecord], now: DateTime<Local>) -> DashboardStats {
    let total = records.len();

    let mut approved = 0;
    let mut needs_review = 0;
    let mut rejected = 0;
    for record in records {
        match record.verdict() {
            Some(Verdict::Approve) => approved += 1,
            Some(Verdict::NeedsMoreDocuments) => needs_review += 1,
            Some(Verdict::Reject) => rejected += 1,
            None => {}
        }
    }

    let (avg_compliance_score, avg_processing_time) = if total == 0 {
        (0.0, DEFAULT_PROCESSING_TIME_SECS)
    } else {
        let score_sum: f64 = records
            .iter()
            .map(|r| r.compliance_score.unwrap_or(0.0))
            .sum();
        let time_sum: f64 = records
            .iter()
            .map(|r| r.processing_time.unwrap_or(DEFAULT_PROCESSING_TIME_SECS))
            .sum();
        (score_sum / total as f64, time_sum / total as f64)
    };

    DashboardStats {
        total,
        approved,
        needs_review,
        rejected,
        avg_compliance_score,
        avg_processing_time,
        recent: recent_analyses(records, now),
    }
}

/// Most recent records first, at most [`RECENT_LIMIT`].
///
/// The sort is stable, so records with equal timestamps keep their storage
/// order. Undated records sort as if created at `now`.
fn recent_analyses(records: &[AnalysisRecord], now: DateTime<Local>) -> Vec<RecentAnalysis> {
    let mut ordered: Vec<&AnalysisRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        let ta = a.timestamp.unwrap_or(now);
        let tb = b.timestamp.unwrap_or(now);
        tb.cmp(&ta)
    });

    ordered
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|record| {
            let at = record.timestamp.unwrap_or(now);
            RecentAnalysis {
                id: record.session_id.clone(),
                company: record
                    .company_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
                decision: record
                    .decision
                    .clone()
                    .unwrap_or_else(|| PENDING_LABEL.to_string()),
                score: record.compliance_score.unwrap_or(0.0),
                date: at.format("%Y-%m-%d").to_string(),
                time: at.format("%H:%M:%S").to_string(),
                documents: record.document_count.unwrap_or(0),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record(id: &str, decision: Option<&str>) -> AnalysisRecord {
        AnalysisRecord {
            session_id: id.to_string(),
            timestamp: None,
            decision: decision.map(str::to_string),
            confidence: None,
            compliance_score: None,
            extracted_fields: BTreeMap::new(),
            detailed_errors: Vec::new(),
            recommendations: Vec::new(),
            document_count: None,
            company_name: None,
            processing_time: None,
        }
    }

    fn dated(id: &str, minutes_ago: i64) -> AnalysisRecord {
        AnalysisRecord {
            timestamp: Some(now() - Duration::minutes(minutes_ago)),
            ..record(id, Some("APPROVE"))
        }
    }

    #[test]
    fn empty_history_yields_zeros_and_default_time() {
        let stats = compute_stats(&[], now());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.approved + stats.needs_review + stats.rejected, 0);
        assert_eq!(stats.avg_compliance_score, 0.0);
        assert_eq!(stats.avg_processing_time, DEFAULT_PROCESSING_TIME_SECS);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.review_rate(), 0.0);
        assert_eq!(stats.rejection_rate(), 0.0);
        assert!(stats.recent.is_empty());
    }

    #[test]
    fn classification_is_exact_and_case_sensitive() {
        let records = vec![
            record("1", Some("APPROVE")),
            record("2", Some("approve")),
            record("3", Some("NEEDS MORE DOCUMENTS")),
            record("4", Some("REJECT ")),
            record("5", Some("REJECT")),
            record("6", None),
        ];
        let stats = compute_stats(&records, now());
        assert_eq!(stats.total, 6);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.needs_review, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.unclassified(), 3);
    }

    #[test]
    fn bucket_counts_hold_for_any_mix() {
        for (a, b, c, u) in [(0, 0, 0, 3), (4, 0, 2, 0), (1, 2, 3, 4), (7, 1, 0, 1)] {
            let mut records = Vec::new();
            records.extend((0..a).map(|i| record(&format!("a{i}"), Some("APPROVE"))));
            records.extend((0..b).map(|i| record(&format!("b{i}"), Some("NEEDS MORE DOCUMENTS"))));
            records.extend((0..c).map(|i| record(&format!("c{i}"), Some("REJECT"))));
            records.extend((0..u).map(|i| record(&format!("u{i}"), None)));

            let stats = compute_stats(&records, now());
            assert_eq!(
                (stats.total, stats.approved, stats.needs_review, stats.rejected),
                (a + b + c + u, a, b, c)
            );
        }
    }

    #[test]
    fn ten_record_example_gives_sixty_percent_success() {
        let mut records = Vec::new();
        records.extend((0..6).map(|i| record(&format!("a{i}"), Some("APPROVE"))));
        records.extend((0..2).map(|i| record(&format!("r{i}"), Some("REJECT"))));
        records.push(record("n", Some("NEEDS MORE DOCUMENTS")));
        records.push(record("p", None));

        let stats = compute_stats(&records, now());
        assert_eq!(stats.total, 10);
        assert_eq!(stats.approved, 6);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.needs_review, 1);
        assert!((stats.success_rate() - 60.0).abs() < 1e-9);
        assert!((stats.rejection_rate() - 20.0).abs() < 1e-9);
        assert!((stats.review_rate() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_score_counts_as_zero() {
        let records = vec![
            AnalysisRecord {
                compliance_score: Some(90.0),
                ..record("1", None)
            },
            record("2", None),
        ];
        let stats = compute_stats(&records, now());
        assert!((stats.avg_compliance_score - 45.0).abs() < 1e-9);
    }

    #[test]
    fn missing_processing_time_uses_default() {
        let records = vec![
            AnalysisRecord {
                processing_time: Some(3.0),
                ..record("1", None)
            },
            record("2", None),
        ];
        let stats = compute_stats(&records, now());
        assert!((stats.avg_processing_time - (3.0 + 5.2) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn recent_is_descending_and_capped() {
        let records: Vec<AnalysisRecord> = [30, 5, 90, 1, 60, 45, 10]
            .iter()
            .enumerate()
            .map(|(i, m)| dated(&format!("r{i}"), *m))
            .collect();
        let stats = compute_stats(&records, now());

        let ids: Vec<&str> = stats.recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r1", "r6", "r0", "r5"]);
        assert_eq!(stats.recent.len(), RECENT_LIMIT);
    }

    #[test]
    fn undated_records_sort_as_now() {
        let records = vec![dated("old", 10), record("undated", None)];
        let stats = compute_stats(&records, now());
        assert_eq!(stats.recent[0].id, "undated");
        assert_eq!(stats.recent[0].date, "2024-06-01");
        assert_eq!(stats.recent[0].time, "12:00:00");
    }

    #[test]
    fn equal_timestamps_keep_storage_order() {
        let records = vec![record("first", None), record("second", None), record("third", None)];
        let stats = compute_stats(&records, now());
        let ids: Vec<&str> = stats.recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn recent_projection_applies_fallbacks() {
        let stats = compute_stats(&[record("bare", None)], now());
        let entry = &stats.recent[0];
        assert_eq!(entry.company, UNKNOWN_COMPANY);
        assert_eq!(entry.decision, PENDING_LABEL);
        assert_eq!(entry.score, 0.0);
        assert_eq!(entry.documents, 0);
    }

    #[test]
    fn recent_projection_carries_record_values() {
        let full = AnalysisRecord {
            company_name: Some("HawkAI Innovations Pvt Ltd".to_string()),
            compliance_score: Some(88.0),
            document_count: Some(5),
            ..dated("full", 0)
        };
        let stats = compute_stats(&[full], now());
        let entry = &stats.recent[0];
        assert_eq!(entry.company, "HawkAI Innovations Pvt Ltd");
        assert_eq!(entry.decision, "APPROVE");
        assert_eq!(entry.score, 88.0);
        assert_eq!(entry.documents, 5);
    }

    #[test]
    fn duplicates_are_counted_individually() {
        let records = vec![record("same", Some("APPROVE")), record("same", Some("APPROVE"))];
        let stats = compute_stats(&records, now());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.approved, 2);
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let records = vec![dated("a", 3), record("b", Some("REJECT"))];
        assert_eq!(compute_stats(&records, now()), compute_stats(&records, now()));
    }

    #[test]
    fn compliance_tiers() {
        assert_eq!(ComplianceTier::from_score(85.0), ComplianceTier::Excellent);
        assert_eq!(ComplianceTier::from_score(84.9), ComplianceTier::Good);
        assert_eq!(ComplianceTier::from_score(60.0), ComplianceTier::Good);
        assert_eq!(ComplianceTier::from_score(0.0), ComplianceTier::NeedsImprovement);
    }
}
