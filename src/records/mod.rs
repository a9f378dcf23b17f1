//! Canonical analysis record.
//!
//! The analysis service returns a loosely shaped JSON document, and older
//! responses keep some fields under a different path. [`AnalysisRecord::from_json`]
//! resolves every field exactly once so that nothing downstream has to
//! know about the legacy layout:
//!
//! | Field              | Primary path                 | Legacy path                             |
//! |--------------------|------------------------------|-----------------------------------------|
//! | `decision`         | `analysis.decision`          | `ai_analysis.decision`                  |
//! | `confidence`       | `analysis.confidence`        | `ai_analysis.confidence`                |
//! | `compliance_score` | `compliance_score`           | `validation_results.completeness.score` |

pub mod formats;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// The three decisions the analysis service can reach.
///
/// Matching is exact and case-sensitive. A record whose decision is missing
/// or spelled any other way has no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "APPROVE")]
    Approve,
    #[serde(rename = "NEEDS MORE DOCUMENTS")]
    NeedsMoreDocuments,
    #[serde(rename = "REJECT")]
    Reject,
}

impl Verdict {
    pub fn classify(decision: &str) -> Option<Self> {
        match decision {
            "APPROVE" => Some(Self::Approve),
            "NEEDS MORE DOCUMENTS" => Some(Self::NeedsMoreDocuments),
            "REJECT" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::NeedsMoreDocuments => "NEEDS MORE DOCUMENTS",
            Self::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label shown for records without a decision.
pub const PENDING_LABEL: &str = "PENDING";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One problem the service found with the submitted documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedError {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_format: Option<String>,
}

/// A completed analysis, normalized from the stored JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub session_id: String,
    pub timestamp: Option<DateTime<Local>>,
    /// Decision as reported, kept verbatim even when unrecognized.
    pub decision: Option<String>,
    pub confidence: Option<f64>,
    pub compliance_score: Option<f64>,
    pub extracted_fields: BTreeMap<String, String>,
    pub detailed_errors: Vec<DetailedError>,
    pub recommendations: Vec<String>,
    pub document_count: Option<u64>,
    pub company_name: Option<String>,
    /// Seconds the service spent on the analysis (`analysis_time`).
    pub processing_time: Option<f64>,
}

/// A stored value that is not a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored analysis {session_id} is not a JSON object")]
pub struct MalformedRecord {
    pub session_id: String,
}

impl AnalysisRecord {
    /// Normalize a raw analysis document.
    ///
    /// Missing or mistyped fields become `None`/empty rather than errors;
    /// only a non-object document is rejected.
    pub fn from_json(session_id: &str, raw: &Value) -> Result<Self, MalformedRecord> {
        if !raw.is_object() {
            return Err(MalformedRecord {
                session_id: session_id.to_string(),
            });
        }

        let decision = first_string(raw, &[&["analysis", "decision"], &["ai_analysis", "decision"]]);
        let confidence = first_number(
            raw,
            &[&["analysis", "confidence"], &["ai_analysis", "confidence"]],
        );
        let compliance_score = first_number(
            raw,
            &[
                &["compliance_score"],
                &["validation_results", "completeness", "score"],
            ],
        );

        let extracted_fields: BTreeMap<String, String> = raw
            .get("extracted_data")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), field_text(value)))
                    .collect()
            })
            .unwrap_or_default();

        let company_name = extracted_fields
            .get("company_name")
            .filter(|name| !name.trim().is_empty())
            .cloned();

        let detailed_errors = raw
            .get("detailed_errors")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let recommendations = raw
            .get("recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            session_id: session_id.to_string(),
            timestamp: raw
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
            decision,
            confidence,
            compliance_score,
            extracted_fields,
            detailed_errors,
            recommendations,
            document_count: raw.get("document_count").and_then(Value::as_u64),
            company_name,
            processing_time: raw.get("analysis_time").and_then(Value::as_f64),
        })
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.decision.as_deref().and_then(Verdict::classify)
    }

    /// Decision for display, `PENDING` when the service gave none.
    pub fn decision_label(&self) -> &str {
        self.decision.as_deref().unwrap_or(PENDING_LABEL)
    }

    /// Local format check of every extracted field that has a known format
    /// and a non-empty value.
    pub fn field_checks(&self) -> BTreeMap<String, bool> {
        self.extracted_fields
            .iter()
            .filter_map(|(field, value)| {
                formats::check_field(field, value).map(|ok| (field.clone(), ok))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

fn lookup<'a>(raw: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(raw, |node, key| node.get(key))
        .filter(|v| !v.is_null())
}

/// First non-empty string among `paths`, in order.
fn first_string(raw: &Value, paths: &[&[&str]]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| lookup(raw, path).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First numeric value among `paths`, in order.
fn first_number(raw: &Value, paths: &[&[&str]]) -> Option<f64> {
    paths
        .iter()
        .find_map(|path| lookup(raw, path).and_then(Value::as_f64))
}

fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the service's zone-less ISO form
/// (`2024-01-15T10:30:00.123456`), which is read as local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local.from_local_datetime(&naive).earliest()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
