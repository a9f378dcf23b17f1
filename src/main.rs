use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use govdoc::cli::{self, OutputFormat};
use govdoc::config;
use govdoc::upload::DocumentSlot;
use govdoc::web;

#[derive(Debug, Parser)]
#[command(name = "govdoc")]
#[command(about = "Government document compliance checks via GovDoc Genie")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit the five required documents for analysis and store the result
    Analyze {
        /// Documents to assign by file name (e.g. gst_cert.pdf, pan.png)
        files: Vec<PathBuf>,
        /// GST certificate
        #[arg(long)]
        gst: Option<PathBuf>,
        /// PAN card
        #[arg(long)]
        pan: Option<PathBuf>,
        /// Udyam registration certificate
        #[arg(long)]
        udyam: Option<PathBuf>,
        /// Quotation with company details and pricing
        #[arg(long)]
        quotation: Option<PathBuf>,
        /// Signed authorization document
        #[arg(long)]
        signature: Option<PathBuf>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// List the required documents and the patterns expected in each
    Slots {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check the analysis service's status and capabilities
    Status {
        /// Keep polling until interrupted
        #[arg(long)]
        watch: bool,
        /// Seconds between polls (default: api.status_poll_secs)
        #[arg(long)]
        interval: Option<u64>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Ask the service which identifier patterns it finds in a document
    TestPatterns {
        file: PathBuf,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show the text the service extracts from a document
    DebugDocument { file: PathBuf },
    /// Download the PDF compliance report for a stored analysis
    Report {
        session_id: String,
        /// Output path (default: compliance-report-<millis>.pdf)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show statistics over all stored analyses
    Dashboard {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage stored analyses
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Serve the history and dashboard as a local JSON API
    Serve {
        /// Listen address (default: web.addr)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum HistoryAction {
    /// List stored analyses
    List {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show one stored analysis
    Show {
        session_id: String,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Write all stored analyses to a JSON file
    Export {
        /// Output path (default: govdoc-analytics-YYYY-MM-DD.json)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Load analyses from an export file
    Import { file: PathBuf },
    /// Delete every stored analysis
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default ~/.govdoc/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `api.timeout_secs 60`
    Set { key: String, value: String },
    /// Restore the default configuration file
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let fmt = |s: &str| OutputFormat::from_str_opt(Some(s));

    match app.command {
        Commands::Analyze {
            files,
            gst,
            pan,
            udyam,
            quotation,
            signature,
            format,
        } => {
            let explicit: Vec<(DocumentSlot, PathBuf)> = [
                (DocumentSlot::Gst, gst),
                (DocumentSlot::Pan, pan),
                (DocumentSlot::Udyam, udyam),
                (DocumentSlot::Quotation, quotation),
                (DocumentSlot::Signature, signature),
            ]
            .into_iter()
            .filter_map(|(slot, path)| path.map(|p| (slot, p)))
            .collect();
            cli::run_analyze(&config::load(), &explicit, &files, fmt(&format))
        }
        Commands::Slots { format } => cli::run_slots(fmt(&format)),
        Commands::Status {
            watch,
            interval,
            format,
        } => cli::run_status(&config::load(), watch, interval, fmt(&format)),
        Commands::TestPatterns { file, format } => {
            cli::run_test_patterns(&config::load(), &file, fmt(&format))
        }
        Commands::DebugDocument { file } => cli::run_debug_document(&config::load(), &file),
        Commands::Report { session_id, output } => {
            cli::run_report(&config::load(), &session_id, output.as_deref())
        }
        Commands::Dashboard { format } => cli::run_dashboard(&config::load(), fmt(&format)),
        Commands::History { action } => {
            let cfg = config::load();
            match action {
                HistoryAction::List { format } => cli::run_history_list(&cfg, fmt(&format)),
                HistoryAction::Show { session_id, format } => {
                    cli::run_history_show(&cfg, &session_id, fmt(&format))
                }
                HistoryAction::Export { output } => {
                    cli::run_history_export(&cfg, output.as_deref())
                }
                HistoryAction::Import { file } => cli::run_history_import(&cfg, &file),
                HistoryAction::Clear { yes } => cli::run_history_clear(&cfg, yes),
            }
        }
        Commands::Serve { addr } => {
            let cfg = config::load();
            let addr = addr.unwrap_or_else(|| cfg.web.addr.clone());
            web::serve(&cfg, &addr)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
