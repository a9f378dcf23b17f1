//! JSON API handlers for the dashboard server.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::analytics::dashboard::{self, ComplianceTier, DashboardStats};
use crate::api::StatusSnapshot;
use crate::history::{self, KeyValueStorage};
use crate::records::AnalysisRecord;
use crate::upload::DocumentSlot;

use super::{Reply, WebState};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

/// Stats plus the rates the dashboard derives from them.
#[derive(Serialize)]
struct StatsResponse {
    #[serde(flatten)]
    stats: DashboardStats,
    unclassified: usize,
    success_rate: f64,
    review_rate: f64,
    rejection_rate: f64,
    compliance_tier: ComplianceTier,
    compliance_tier_description: &'static str,
}

#[derive(Serialize)]
struct AnalysisResponse {
    record: AnalysisRecord,
    field_checks: BTreeMap<String, bool>,
    raw: Value,
}

#[derive(Serialize)]
struct SlotResponse {
    key: &'static str,
    form_field: &'static str,
    label: &'static str,
    description: &'static str,
    required: bool,
    expected_pattern: &'static str,
    help_text: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    service_url: String,
    history_entries: usize,
    backend: Option<StatusSnapshot>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Value of one `?key=value` query parameter.
fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key { Some(v) } else { None }
    })
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/stats`: dashboard statistics over the whole history.
pub fn get_stats<S: KeyValueStorage>(state: &WebState<S>) -> Result<Reply> {
    let stats = dashboard::compute_stats_now(&state.history.list()?);
    let tier = stats.compliance_tier();
    Reply::json(&StatsResponse {
        unclassified: stats.unclassified(),
        success_rate: stats.success_rate(),
        review_rate: stats.review_rate(),
        rejection_rate: stats.rejection_rate(),
        compliance_tier: tier,
        compliance_tier_description: tier.description(),
        stats,
    })
}

/// `GET /api/history?limit=N`: normalized records in creation order; with
/// `limit`, only the newest N.
pub fn get_history<S: KeyValueStorage>(state: &WebState<S>, url: &str) -> Result<Reply> {
    let mut records = state.history.list()?;
    if let Some(limit) = query_param(url, "limit").and_then(|v| v.parse::<usize>().ok()) {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }
    Reply::json(&records)
}

/// `GET /api/history/<id>`: one analysis with its local field checks.
pub fn get_analysis<S: KeyValueStorage>(state: &WebState<S>, session_id: &str) -> Result<Reply> {
    let Some(raw) = state.history.get_raw(session_id)? else {
        return Ok(Reply::not_found());
    };
    let record = AnalysisRecord::from_json(session_id, &raw)?;
    Reply::json(&AnalysisResponse {
        field_checks: record.field_checks(),
        record,
        raw,
    })
}

/// `GET /api/export`: the full history as a downloadable JSON array.
pub fn get_export<S: KeyValueStorage>(state: &WebState<S>) -> Result<Reply> {
    Ok(Reply {
        status: 200,
        body: state.history.export()?,
        download_name: Some(history::export_file_name(
            chrono::Local::now().date_naive(),
        )),
    })
}

/// `POST /api/history/clear?confirm=true`: delete every stored analysis.
pub fn post_clear<S: KeyValueStorage>(state: &mut WebState<S>, url: &str) -> Result<Reply> {
    if query_param(url, "confirm") != Some("true") {
        return Ok(Reply::error(
            400,
            "clearing history is irreversible; repeat with ?confirm=true",
        ));
    }
    let removed = state.history.clear()?;
    Reply::json(&serde_json::json!({ "removed": removed }))
}

/// `GET /api/slots`: the document manifest.
pub fn get_slots() -> Result<Reply> {
    let slots: Vec<SlotResponse> = DocumentSlot::ALL
        .into_iter()
        .map(|slot| {
            let spec = slot.spec();
            SlotResponse {
                key: slot.key(),
                form_field: slot.form_field(),
                label: spec.label,
                description: spec.description,
                required: spec.required,
                expected_pattern: spec.expected_pattern,
                help_text: spec.help_text,
            }
        })
        .collect();
    Reply::json(&slots)
}

/// `GET /api/health`: latest backend poll and local history size.
pub fn get_health<S: KeyValueStorage>(state: &WebState<S>) -> Result<Reply> {
    Reply::json(&HealthResponse {
        service_url: state.api_base_url.clone(),
        history_entries: state.history.len()?,
        backend: state.poller.as_ref().and_then(|p| p.latest()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
