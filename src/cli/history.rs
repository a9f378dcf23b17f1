//! `govdoc dashboard` and `govdoc history …`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::dashboard::{self, DashboardStats, UNKNOWN_COMPANY};
use crate::config::GovDocConfig;
use crate::history::{self, HistoryStore};
use crate::records::AnalysisRecord;

use super::OutputFormat;
use super::render::{colorize_decision, csv_field, print_analysis, truncate};

// ---------------------------------------------------------------------------
// govdoc dashboard
// ---------------------------------------------------------------------------

/// Show aggregate statistics over the stored analyses.
pub fn run_dashboard(config: &GovDocConfig, format: OutputFormat) -> Result<()> {
    let records = HistoryStore::open(config)?.list()?;
    let stats = dashboard::compute_stats_now(&records);

    match format {
        OutputFormat::Json => print_dashboard_json(&stats)?,
        OutputFormat::Csv => print_dashboard_csv(&stats),
        OutputFormat::Table => {
            if stats.total == 0 {
                println!(
                    "{}",
                    "No analyses yet. Run `govdoc analyze` to see dashboard stats.".yellow()
                );
                return Ok(());
            }
            print_dashboard_table(&stats);
        }
    }

    Ok(())
}

fn print_dashboard_table(stats: &DashboardStats) {
    println!("{}", "GovDoc Analytics Dashboard".bold().cyan());
    println!("{}", "=".repeat(60));
    println!();

    println!("  {} {}", "Total analyses: ".bold(), stats.total);
    println!(
        "  {} {} ({:.1}%)",
        "Approved:       ".bold(),
        stats.approved.to_string().green(),
        stats.success_rate()
    );
    println!(
        "  {} {} ({:.1}%)",
        "Needs review:   ".bold(),
        stats.needs_review.to_string().yellow(),
        stats.review_rate()
    );
    println!(
        "  {} {} ({:.1}%)",
        "Rejected:       ".bold(),
        stats.rejected.to_string().red(),
        stats.rejection_rate()
    );
    if stats.unclassified() > 0 {
        println!("  {} {}", "Pending/other:  ".bold(), stats.unclassified());
    }
    println!();

    let tier = stats.compliance_tier();
    println!(
        "  {} {:.1}  {}",
        "Avg compliance: ".bold(),
        stats.avg_compliance_score,
        tier.description().dimmed()
    );
    println!(
        "  {} {:.1}s",
        "Avg processing: ".bold(),
        stats.avg_processing_time
    );
    println!();

    if !stats.recent.is_empty() {
        println!("{}", "Recent Analyses".bold().cyan());
        println!(
            "  {:<24} {:<22} {:>5} {:>4}  {:<10} {:<8}",
            "Company", "Decision", "Score", "Docs", "Date", "Time"
        );
        println!("  {}", "-".repeat(80));
        for (i, recent) in stats.recent.iter().enumerate() {
            let line = format!(
                "  {:<24} {:<22} {:>5.0} {:>4}  {:<10} {:<8}",
                truncate(&recent.company, 24),
                recent.decision,
                recent.score,
                recent.documents,
                recent.date,
                recent.time,
            );
            if i % 2 == 0 {
                println!("{line}");
            } else {
                println!("{}", line.dimmed());
            }
        }
    }
}

fn print_dashboard_json(stats: &DashboardStats) -> Result<()> {
    let value = serde_json::json!({
        "total": stats.total,
        "approved": stats.approved,
        "needs_review": stats.needs_review,
        "rejected": stats.rejected,
        "success_rate": stats.success_rate(),
        "review_rate": stats.review_rate(),
        "rejection_rate": stats.rejection_rate(),
        "avg_compliance_score": stats.avg_compliance_score,
        "avg_processing_time": stats.avg_processing_time,
        "compliance_tier": stats.compliance_tier(),
        "recent": stats.recent,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_dashboard_csv(stats: &DashboardStats) {
    println!("id,company,decision,score,date,time,documents");
    for r in &stats.recent {
        println!(
            "{},{},{},{},{},{},{}",
            csv_field(&r.id),
            csv_field(&r.company),
            csv_field(&r.decision),
            r.score,
            r.date,
            r.time,
            r.documents
        );
    }
}

// ---------------------------------------------------------------------------
// govdoc history list | show
// ---------------------------------------------------------------------------

/// List every stored analysis, oldest first.
pub fn run_history_list(config: &GovDocConfig, format: OutputFormat) -> Result<()> {
    let records = HistoryStore::open(config)?.list()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Csv => print_history_csv(&records),
        OutputFormat::Table => {
            if records.is_empty() {
                println!("{}", "No stored analyses.".yellow());
                return Ok(());
            }
            print_history_table(&records);
        }
    }
    Ok(())
}

fn print_history_table(records: &[AnalysisRecord]) {
    println!("{}", "Stored Analyses".bold().cyan());
    println!(
        "  {:<32} {:<19} {:<22} {:<22} {:>5}",
        "Session", "Analyzed", "Company", "Decision", "Score"
    );
    println!("  {}", "-".repeat(104));
    for record in records {
        let when = record
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let company = record.company_name.as_deref().unwrap_or(UNKNOWN_COMPANY);
        let score = record
            .compliance_score
            .map(|s| format!("{s:.0}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<32} {:<19} {:<22} {:<22} {:>5}",
            truncate(&record.session_id, 32),
            when,
            truncate(company, 22),
            colorize_decision(&format!("{:<22}", record.decision_label())),
            score
        );
    }
}

fn print_history_csv(records: &[AnalysisRecord]) {
    println!("session_id,timestamp,company,decision,compliance_score,documents");
    for r in records {
        println!(
            "{},{},{},{},{},{}",
            csv_field(&r.session_id),
            r.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
            csv_field(r.company_name.as_deref().unwrap_or_default()),
            csv_field(r.decision_label()),
            r.compliance_score.map(|s| s.to_string()).unwrap_or_default(),
            r.document_count.map(|d| d.to_string()).unwrap_or_default(),
        );
    }
}

/// Show one stored analysis.
pub fn run_history_show(config: &GovDocConfig, session_id: &str, format: OutputFormat) -> Result<()> {
    let history = HistoryStore::open(config)?;
    let raw = history
        .get_raw(session_id)?
        .with_context(|| format!("no stored analysis with session id {session_id}"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&raw)?),
        _ => print_analysis(&AnalysisRecord::from_json(session_id, &raw)?),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// govdoc history export | import | clear
// ---------------------------------------------------------------------------

/// Write every stored analysis to one JSON array file.
pub fn run_history_export(config: &GovDocConfig, output: Option<&Path>) -> Result<()> {
    let history = HistoryStore::open(config)?;
    let json = history.export()?;
    let path = match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(history::export_file_name(chrono::Local::now().date_naive())),
    };
    fs::write(&path, &json).with_context(|| format!("failed to write {}", path.display()))?;

    println!(
        "{} Exported {} analyses to {}",
        "✓".green().bold(),
        history.list_raw()?.len(),
        path.display()
    );
    Ok(())
}

/// Load analyses from an export file.
pub fn run_history_import(config: &GovDocConfig, input: &Path) -> Result<()> {
    let json =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let mut history = HistoryStore::open(config)?;
    let count = history.import(&json)?;
    println!(
        "{} Imported {} analyses from {}",
        "✓".green().bold(),
        count,
        input.display()
    );
    Ok(())
}

/// Delete every stored analysis. Refuses without `--yes`.
pub fn run_history_clear(config: &GovDocConfig, yes: bool) -> Result<()> {
    let mut history = HistoryStore::open(config)?;
    let count = history.len()?;
    if count == 0 {
        println!("{}", "History is already empty.".yellow());
        return Ok(());
    }
    if !yes {
        anyhow::bail!(
            "refusing to delete {count} stored analyses without --yes (this cannot be undone)"
        );
    }
    let removed = history.clear()?;
    println!("{} Removed {} analyses", "✓".green().bold(), removed);
    Ok(())
}
