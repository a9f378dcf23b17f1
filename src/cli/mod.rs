//! CLI command implementations for govdoc.
//!
//! Provides subcommand handlers for:
//! - `govdoc analyze`: validate, submit and store a document analysis
//! - `govdoc slots`: the required documents and their expected patterns
//! - `govdoc status`: backend capability check, optionally polled
//! - `govdoc test-patterns` / `debug-document`: backend diagnostics
//! - `govdoc report`: PDF report for a stored analysis
//! - `govdoc dashboard` / `history …`: local history and statistics
//! - `govdoc config show|init|set|reset`: configuration management

pub mod analyze;
pub mod history;
pub mod render;

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;

use crate::analytics::events::EventLog;
use crate::api::{ApiClient, StatusPoller, StatusSnapshot, SystemStatus};
use crate::config::{self, GovDocConfig};
use crate::upload::DocumentSlot;

pub use analyze::{run_analyze, run_debug_document, run_report, run_test_patterns};
pub use history::{
    run_dashboard, run_history_clear, run_history_export, run_history_import, run_history_list,
    run_history_show,
};

/// Output format for reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// govdoc slots
// ---------------------------------------------------------------------------

/// Show the document manifest.
pub fn run_slots(format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let slots: Vec<_> = DocumentSlot::ALL
            .into_iter()
            .map(|slot| {
                serde_json::json!({
                    "key": slot.key(),
                    "form_field": slot.form_field(),
                    "spec": slot.spec(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&slots)?);
        return Ok(());
    }

    println!("{}", "Required Documents".bold().cyan());
    println!("{}", "=".repeat(60));
    for slot in DocumentSlot::ALL {
        let spec = slot.spec();
        println!();
        println!(
            "  {} {}",
            format!("--{:<10}", slot.key()).bold(),
            spec.label.bold()
        );
        println!("    {}", spec.description);
        println!(
            "    {} {}  {}",
            "e.g.".dimmed(),
            spec.expected_pattern,
            format!("({})", spec.help_text).dimmed()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// govdoc status
// ---------------------------------------------------------------------------

/// Check the backend once, or keep polling with `watch`.
pub fn run_status(
    config: &GovDocConfig,
    watch: bool,
    interval_secs: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let client = ApiClient::from_config(&config.api)
        .with_events(EventLog::from_config(&config.logging));

    if !watch {
        let status = client.system_status()?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
            _ => print_status_table(client.base_url(), &status),
        }
        return Ok(());
    }

    let secs = interval_secs.unwrap_or(config.api.status_poll_secs).max(1);
    if format != OutputFormat::Json {
        println!(
            "{}",
            format!("Polling {} every {secs}s. Press Ctrl+C to stop.", client.base_url()).dimmed()
        );
    }
    let base_url = client.base_url().to_string();
    let (_poller, updates) = StatusPoller::watch(client, Duration::from_secs(secs));
    for snapshot in updates {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&snapshot)?),
            _ => print_status_line(&base_url, &snapshot),
        }
    }
    Ok(())
}

fn print_status_table(base_url: &str, status: &SystemStatus) {
    println!("{}", "GovDoc Backend Status".bold().cyan());
    println!("{}", "=".repeat(40));
    let service = format!(
        "{} ({})",
        status.status.as_deref().unwrap_or("unknown"),
        base_url
    );
    print_health_item("Service", status.is_ready(), &service);
    if let Some(accuracy) = &status.accuracy {
        print_health_item("Accuracy", true, accuracy);
    }
    print_flag("OCR support", status.ocr_support);
    print_flag("Image PDF support", status.image_pdf_support);
    if let Some(model) = &status.local_model {
        print_health_item("Local model", model == "loaded", model);
    }
    print_flag("Datadog", status.datadog_enabled);

    if !status.pattern_examples.is_empty() {
        println!();
        println!("{}", "Pattern Examples".bold().cyan());
        for (name, example) in &status.pattern_examples {
            println!("  {:<12} {}", name, example.dimmed());
        }
    }
}

fn print_flag(name: &str, flag: Option<bool>) {
    if let Some(on) = flag {
        print_health_item(name, on, if on { "enabled" } else { "disabled" });
    }
}

fn print_status_line(base_url: &str, snapshot: &StatusSnapshot) {
    let time = snapshot.checked_at.format("%H:%M:%S");
    match (&snapshot.status, &snapshot.error) {
        (Some(status), _) => {
            let ok = status.is_ready();
            let mark = if ok { "✓".green().bold() } else { "✗".red().bold() };
            println!(
                "  {} {} {} {}",
                time.to_string().dimmed(),
                mark,
                status.status.as_deref().unwrap_or("unknown"),
                base_url.dimmed()
            );
        }
        (None, error) => println!(
            "  {} {} {}",
            time.to_string().dimmed(),
            "✗".red().bold(),
            error.as_deref().unwrap_or("no response")
        ),
    }
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// govdoc config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective govdoc Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.govdoc/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.govdoc/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".govdoc.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".govdoc.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "GOVDOC_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.govdoc/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!("  {}", "Edit the file to point govdoc at another backend.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
