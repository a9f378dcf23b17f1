//! Event log: one JSON line per remote call or notable store event.
//!
//! Used for after-the-fact diagnosis ("why did yesterday's upload fail?")
//! without adding noise to command output. Every append is best-effort:
//! failures are silently ignored.
//!
//! Log file: `~/.govdoc/events.jsonl` (configurable under `[logging]`).

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Event entries
// ---------------------------------------------------------------------------

/// Outcome of a call to the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEvent {
    pub timestamp: String,
    /// Endpoint path, e.g. `"/analyze"`.
    pub endpoint: String,
    /// `"ok"` or `"error"`.
    pub outcome: String,
    /// HTTP status, when a response arrived at all.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<u16>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ApiEvent {
    pub fn ok(endpoint: &str, status: u16, latency_ms: u64) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            endpoint: endpoint.to_string(),
            outcome: "ok".to_string(),
            status: Some(status),
            latency_ms,
            error: None,
        }
    }

    pub fn failed(endpoint: &str, status: Option<u16>, latency_ms: u64, error: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            endpoint: endpoint.to_string(),
            outcome: "error".to_string(),
            status,
            latency_ms,
            error: Some(error.to_string()),
        }
    }
}

/// Something the history store did that is worth a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEvent {
    pub timestamp: String,
    /// `"skipped"` or `"cleared"`.
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

impl StoreEvent {
    /// A stored entry that could not be read and was left out.
    pub fn skipped(session_id: &str, reason: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            action: "skipped".to_string(),
            session_id: Some(session_id.to_string()),
            detail: Some(reason.to_string()),
        }
    }

    pub fn cleared(removed: usize) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            action: "cleared".to_string(),
            session_id: None,
            detail: Some(format!("{removed} entries removed")),
        }
    }
}

/// Either kind of line in the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogLine {
    Api(ApiEvent),
    Store(StoreEvent),
}

// ---------------------------------------------------------------------------
// Log handle
// ---------------------------------------------------------------------------

/// Append-only JSONL event log. A disabled log drops everything.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            path: config.event_log_path(),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record_api(&self, event: ApiEvent) {
        self.append(&LogLine::Api(event));
    }

    pub fn record_store(&self, event: StoreEvent) {
        self.append(&LogLine::Store(event));
    }

    fn append(&self, line: &LogLine) {
        let _ = self.try_append(line);
    }

    fn try_append(&self, line: &LogLine) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(line)?;
        writeln!(file, "{json}")?;

        Ok(())
    }

    /// Read every well-formed line back. Malformed lines are skipped.
    pub fn read_all(&self) -> Vec<LogLine> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<LogLine>(&line).ok())
            .collect()
    }
}
