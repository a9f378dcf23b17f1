//! `govdoc analyze`, `test-patterns`, `debug-document` and `report`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;

use crate::analytics::events::EventLog;
use crate::api::{ApiClient, PatternReport};
use crate::config::GovDocConfig;
use crate::history::HistoryStore;
use crate::records::AnalysisRecord;
use crate::upload::{AttachedFile, DocumentSlot, UploadError, UploadPolicy, UploadSession};

use super::OutputFormat;
use super::render::{format_bytes, print_analysis, truncate};

fn client(config: &GovDocConfig) -> ApiClient {
    ApiClient::from_config(&config.api).with_events(EventLog::from_config(&config.logging))
}

// ---------------------------------------------------------------------------
// govdoc analyze
// ---------------------------------------------------------------------------

/// Pair every file with its slot: explicit flags first, then positional
/// files by name.
pub fn assign_slots(
    explicit: &[(DocumentSlot, PathBuf)],
    positional: &[PathBuf],
) -> Result<Vec<(DocumentSlot, PathBuf)>> {
    let mut assigned: Vec<(DocumentSlot, PathBuf)> = explicit.to_vec();

    for path in positional {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let Some(slot) = DocumentSlot::infer_from_file_name(name) else {
            anyhow::bail!(
                "cannot tell which document {} is; pass it with --gst, --pan, --udyam, --quotation or --signature",
                path.display()
            );
        };
        if let Some((_, existing)) = assigned.iter().find(|(s, _)| *s == slot) {
            anyhow::bail!(
                "both {} and {} look like the {} document; pass one with --{}",
                existing.display(),
                path.display(),
                slot.label(),
                slot.key()
            );
        }
        assigned.push((slot, path.clone()));
    }

    Ok(assigned)
}

/// Validate the files, send them for analysis and store the result.
pub fn run_analyze(
    config: &GovDocConfig,
    explicit: &[(DocumentSlot, PathBuf)],
    positional: &[PathBuf],
    format: OutputFormat,
) -> Result<()> {
    let mut session = UploadSession::new(UploadPolicy::from_config(&config.upload));
    for (slot, path) in assign_slots(explicit, positional)? {
        let file = AttachedFile::from_path(&path)?;
        session
            .attach(slot, file)
            .with_context(|| format!("{} rejected", slot.label()))?;
    }

    let submission = match session.submit() {
        Ok(submission) => submission,
        Err(err @ UploadError::MissingDocuments(_)) => {
            print_missing(&session.missing_required());
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    if format == OutputFormat::Table {
        println!("{}", "Submitting documents".bold().cyan());
        for (slot, file) in &submission.documents {
            println!(
                "  {} {:<20} {} {}",
                "✓".green().bold(),
                slot.label(),
                file.name,
                format!("({})", format_bytes(file.size)).dimmed()
            );
        }
        println!();
        println!("{}", "Analyzing… this can take a minute.".dimmed());
        println!();
    }

    let raw = client(config).analyze(&submission)?;
    let mut history = HistoryStore::open(config)?;
    let session_id = history.put(&raw)?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "session_id": session_id, "result": raw });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            let record = AnalysisRecord::from_json(&session_id, &raw)?;
            print_analysis(&record);
            println!();
            println!(
                "  {} govdoc report {}",
                "PDF report:".dimmed(),
                session_id
            );
        }
    }

    Ok(())
}

fn print_missing(missing: &[DocumentSlot]) {
    println!("{}", "Missing required documents".bold().red());
    for slot in missing {
        let spec = slot.spec();
        println!(
            "  {} {:<20} --{:<10} {}",
            "✗".red().bold(),
            spec.label,
            slot.key(),
            spec.description.dimmed()
        );
    }
    println!();
}

// ---------------------------------------------------------------------------
// govdoc test-patterns
// ---------------------------------------------------------------------------

/// Ask the service which identifier patterns it finds in one document.
pub fn run_test_patterns(config: &GovDocConfig, path: &Path, format: OutputFormat) -> Result<()> {
    let file = checked_file(config, path)?;
    let report = client(config).test_patterns(&file)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_pattern_report(&report),
    }
    Ok(())
}

fn print_pattern_report(report: &PatternReport) {
    println!("{}", "Pattern Test".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();
    println!("  {} {}", "File:         ".bold(), report.filename);
    println!("  {} {}", "Text length:  ".bold(), report.text_length);
    println!("  {} {}", "Text elements:".bold(), report.extracted_elements);
    println!();

    println!("  {:<3} {:<14} {:>5}  Samples", "", "Pattern", "Count");
    println!("  {}", "-".repeat(56));
    for (name, result) in &report.patterns {
        let mark = if result.found {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        };
        println!(
            "  {:<3} {:<14} {:>5}  {}",
            mark,
            name,
            result.count,
            truncate(&result.samples().join(", "), 40)
        );
    }

    if !report.text_sample.is_empty() {
        println!();
        println!("{}", "Text sample".bold().cyan());
        println!("  {}", truncate(&report.text_sample, 300).dimmed());
    }
}

// ---------------------------------------------------------------------------
// govdoc debug-document
// ---------------------------------------------------------------------------

/// Show what text the service extracts from one document.
pub fn run_debug_document(config: &GovDocConfig, path: &Path) -> Result<()> {
    let file = checked_file(config, path)?;
    let info = client(config).debug_document(&file)?;

    if info.get("success").and_then(Value::as_bool) == Some(false) {
        let error = info.get("error").and_then(Value::as_str).unwrap_or("unknown error");
        println!("{} {}", "✗".red().bold(), error);
        if let Some(suggestions) = info.get("suggestions").and_then(Value::as_array) {
            for s in suggestions.iter().filter_map(Value::as_str) {
                println!("  • {s}");
            }
        }
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// A single local file, checked against the upload policy before sending.
fn checked_file(config: &GovDocConfig, path: &Path) -> Result<AttachedFile> {
    let file = AttachedFile::from_path(path)?;
    UploadPolicy::from_config(&config.upload).check(&file)?;
    Ok(file)
}

// ---------------------------------------------------------------------------
// govdoc report
// ---------------------------------------------------------------------------

/// Default report file name, stamped in Unix milliseconds.
pub fn report_file_name(unix_millis: i64) -> String {
    format!("compliance-report-{unix_millis}.pdf")
}

/// Have the service render a stored analysis as a PDF and save it.
pub fn run_report(config: &GovDocConfig, session_id: &str, output: Option<&Path>) -> Result<()> {
    let history = HistoryStore::open(config)?;
    let raw = history
        .get_raw(session_id)?
        .with_context(|| format!("no stored analysis with session id {session_id}"))?;

    let pdf = client(config).generate_report(&raw)?;

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(report_file_name(chrono::Utc::now().timestamp_millis())),
    };
    fs::write(&path, &pdf).with_context(|| format!("failed to write {}", path.display()))?;

    println!(
        "{} Report saved to {} {}",
        "✓".green().bold(),
        path.display(),
        format!("({})", format_bytes(pdf.len() as u64)).dimmed()
    );
    Ok(())
}
