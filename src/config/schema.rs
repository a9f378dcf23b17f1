/// Configuration schema and defaults for the govdoc client.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[api]`, `[upload]`, `[storage]`, `[logging]`, and `[web]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Deployed GovDoc Genie analysis service.
pub const DEFAULT_API_URL: &str = "https://govdoc-genie-279947895522.asia-south1.run.app";

/// Upload size ceiling enforced before anything is sent (16 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level govdoc configuration.
///
/// Maps directly to `~/.govdoc/config.toml` and `.govdoc.toml`. All sections
/// and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GovDocConfig {
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Remote analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the analysis service, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds. Analysis runs OCR server-side, so
    /// this is generous.
    pub timeout_secs: u64,
    /// Interval between background `system-status` polls.
    pub status_poll_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 120,
            status_poll_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// [upload]
// ---------------------------------------------------------------------------

/// Local checks applied when a file is attached to a document slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted file, in bytes.
    pub max_file_bytes: u64,
    /// Accepted file extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            allowed_extensions: ["pdf", "png", "jpg", "jpeg"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// [storage]
// ---------------------------------------------------------------------------

/// Analysis history storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per stored analysis. `~` is expanded.
    pub history_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_dir: "~/.govdoc/history".to_string(),
        }
    }
}

impl StorageConfig {
    /// Resolved history directory.
    pub fn history_path(&self) -> Option<PathBuf> {
        expand_home(&self.history_dir)
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Event log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether API calls and store events are appended to the event log.
    pub enabled: bool,
    /// Path to the JSONL event log. `~` is expanded.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.govdoc/events.jsonl".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Resolved event log path, or `None` when logging is off.
    pub fn event_log_path(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        expand_home(&self.path)
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Local dashboard server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `govdoc serve`.
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(raw: &str) -> Option<PathBuf> {
    if raw == "~" {
        return dirs::home_dir();
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    Some(PathBuf::from(raw))
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl GovDocConfig {
    /// Annotated default config file content, written by `govdoc config init`.
    pub fn default_toml() -> String {
        r#"# govdoc Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (GOVDOC_*)
#   2. Project config (.govdoc.toml in current directory)
#   3. User global config (~/.govdoc/config.toml)
#   4. Built-in defaults

[api]
base_url = "https://govdoc-genie-279947895522.asia-south1.run.app"
timeout_secs = 120
status_poll_secs = 30                 # Background system-status poll interval

[upload]
max_file_bytes = 16777216             # 16 MiB
allowed_extensions = ["pdf", "png", "jpg", "jpeg"]

[storage]
history_dir = "~/.govdoc/history"

[logging]
enabled = true
path = "~/.govdoc/events.jsonl"

[web]
addr = "127.0.0.1:9747"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
