//! Analysis history store.
//!
//! Every completed analysis is kept as the JSON document the service
//! returned, under the key `govdoc_results_<session-id>`. This module is the
//! only place that knows about that key convention: callers go through
//! [`HistoryStore::list`], [`put`](HistoryStore::put),
//! [`clear`](HistoryStore::clear) and [`export`](HistoryStore::export).
//!
//! Entries that fail to parse are skipped (and noted in the event log) so
//! one corrupt file never hides the rest of the history.

pub mod storage;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::analytics::events::{EventLog, StoreEvent};
use crate::config::GovDocConfig;
use crate::records::AnalysisRecord;

pub use storage::{DirStorage, KeyValueStorage, MemoryStorage};

/// Prefix shared by every history key.
pub const KEY_PREFIX: &str = "govdoc_results_";

/// Repository over a [`KeyValueStorage`] backend.
pub struct HistoryStore<S: KeyValueStorage = DirStorage> {
    storage: S,
    events: EventLog,
}

impl HistoryStore<DirStorage> {
    /// Open the directory-backed history named by the configuration.
    pub fn open(config: &GovDocConfig) -> Result<Self> {
        let dir = config
            .storage
            .history_path()
            .context("could not determine home directory for history storage")?;
        Ok(Self::new(DirStorage::new(dir)).with_events(EventLog::from_config(&config.logging)))
    }
}

impl<S: KeyValueStorage> HistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            events: EventLog::disabled(),
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Store a completed analysis under a fresh session id.
    ///
    /// Only terminal results are stored: a document that is not a JSON
    /// object, or that reports `"success": false`, is refused.
    pub fn put(&mut self, raw: &Value) -> Result<String> {
        let session_id = new_session_id();
        self.put_with_id(&session_id, raw)?;
        Ok(session_id)
    }

    /// Store a completed analysis under a caller-chosen session id.
    pub fn put_with_id(&mut self, session_id: &str, raw: &Value) -> Result<()> {
        check_storable(session_id, raw)?;
        let body = serde_json::to_string(raw).context("failed to serialize analysis")?;
        self.storage
            .set(&storage_key(session_id), &body)
            .with_context(|| format!("failed to store analysis {session_id}"))
    }

    /// The raw stored document for one session.
    pub fn get_raw(&self, session_id: &str) -> Result<Option<Value>> {
        let Some(body) = self.storage.get(&storage_key(session_id))? else {
            return Ok(None);
        };
        let raw = serde_json::from_str(&body)
            .with_context(|| format!("stored analysis {session_id} is not valid JSON"))?;
        Ok(Some(raw))
    }

    /// One session, normalized.
    pub fn get(&self, session_id: &str) -> Result<Option<AnalysisRecord>> {
        match self.get_raw(session_id)? {
            Some(raw) => Ok(Some(AnalysisRecord::from_json(session_id, &raw)?)),
            None => Ok(None),
        }
    }

    /// Every readable stored document with its session id, in key order.
    pub fn list_raw(&self) -> Result<Vec<(String, Value)>> {
        let mut entries = Vec::new();
        for key in self.history_keys()? {
            let session_id = key[KEY_PREFIX.len()..].to_string();
            let parsed = match self.storage.get(&key) {
                Ok(Some(body)) => serde_json::from_str::<Value>(&body).map_err(|e| e.to_string()),
                Ok(None) => continue,
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(raw) => entries.push((session_id, raw)),
                Err(reason) => self.events.record_store(StoreEvent::skipped(&session_id, &reason)),
            }
        }
        Ok(entries)
    }

    /// Every readable analysis, normalized, in key order.
    pub fn list(&self) -> Result<Vec<AnalysisRecord>> {
        let records = self
            .list_raw()?
            .into_iter()
            .filter_map(|(session_id, raw)| {
                match AnalysisRecord::from_json(&session_id, &raw) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        self.events
                            .record_store(StoreEvent::skipped(&session_id, &e.to_string()));
                        None
                    }
                }
            })
            .collect();
        Ok(records)
    }

    /// Number of stored analyses, readable or not.
    pub fn len(&self) -> Result<usize> {
        Ok(self.history_keys()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Delete every stored analysis. Keys outside the history prefix are
    /// left alone. Returns the number of entries removed.
    pub fn clear(&mut self) -> Result<usize> {
        let keys = self.history_keys()?;
        for key in &keys {
            self.storage.remove(key)?;
        }
        self.events.record_store(StoreEvent::cleared(keys.len()));
        Ok(keys.len())
    }

    /// All readable stored documents as one pretty-printed JSON array.
    pub fn export(&self) -> Result<String> {
        let values: Vec<Value> = self.list_raw()?.into_iter().map(|(_, raw)| raw).collect();
        serde_json::to_string_pretty(&values).context("failed to serialize history export")
    }

    /// Load a JSON array produced by [`export`](Self::export).
    ///
    /// Entries receive new session ids that sort in array order, so a
    /// following export lists them in the same order. Every entry is checked
    /// before any is written, so a refused import stores nothing. Returns the
    /// number of entries stored.
    pub fn import(&mut self, json: &str) -> Result<usize> {
        let values: Vec<Value> =
            serde_json::from_str(json).context("history import must be a JSON array")?;
        let stamp = sortable_stamp(Utc::now());
        let entries: Vec<(String, &Value)> = values
            .iter()
            .enumerate()
            .map(|(index, raw)| (format!("{stamp}-{index:06}"), raw))
            .collect();
        for (index, (session_id, raw)) in entries.iter().enumerate() {
            check_storable(session_id, raw)
                .with_context(|| format!("import entry {index} is not a stored analysis"))?;
        }
        for (session_id, raw) in &entries {
            self.put_with_id(session_id, raw)?;
        }
        Ok(entries.len())
    }

    fn history_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .storage
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(KEY_PREFIX) && key.len() > KEY_PREFIX.len())
            .collect())
    }
}

fn storage_key(session_id: &str) -> String {
    format!("{KEY_PREFIX}{session_id}")
}

/// Only terminal results are stored.
fn check_storable(session_id: &str, raw: &Value) -> Result<()> {
    if !raw.is_object() {
        anyhow::bail!("refusing to store analysis {session_id}: not a JSON object");
    }
    if raw.get("success").and_then(Value::as_bool) == Some(false) {
        anyhow::bail!("refusing to store analysis {session_id}: the analysis did not succeed");
    }
    Ok(())
}

/// UTC creation time down to the millisecond. Lexical order is time order.
fn sortable_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S%3f").to_string()
}

/// A new session id: UTC creation time followed by 12 hex digits of a
/// UUID v4, so that key order follows creation order.
pub fn new_session_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", sortable_stamp(Utc::now()), &random[..12])
}

/// Default file name for a history export taken on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("govdoc-analytics-{}.json", date.format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
