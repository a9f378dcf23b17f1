//! HTTP client for the GovDoc Genie analysis service.
//!
//! A thin synchronous adapter over `ureq`. Each call is a single
//! request/response with no retry: a transport failure or non-2xx status
//! becomes one [`ApiError`] whose message is shown to the user as is.
//! Every call is recorded in the event log.

pub mod multipart;
pub mod poller;

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::analytics::events::{ApiEvent, EventLog};
use crate::config::schema::ApiConfig;
use crate::upload::{AttachedFile, Submission, UploadError};

use multipart::MultipartBody;

pub use poller::{StatusPoller, StatusSnapshot};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response at all: DNS, connect, TLS, timeout.
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    /// The service answered but reported `"success": false`.
    #[error("analysis failed: {0}")]
    Rejected(String),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Capability flags from `GET /system-status`. Display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub status: Option<String>,
    pub accuracy: Option<String>,
    pub ocr_support: Option<bool>,
    pub image_pdf_support: Option<bool>,
    pub local_model: Option<String>,
    pub datadog_enabled: Option<bool>,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub pattern_examples: BTreeMap<String, String>,
}

impl SystemStatus {
    pub fn is_ready(&self) -> bool {
        self.status.as_deref() == Some("ready")
    }
}

/// One pattern's result in a [`PatternReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub count: u64,
    /// Up to five sample matches; grouped patterns come back as arrays.
    #[serde(default)]
    pub matches: Vec<Value>,
}

impl PatternMatch {
    /// Matches flattened to display strings.
    pub fn samples(&self) -> Vec<String> {
        self.matches
            .iter()
            .map(|m| match m {
                Value::String(s) => s.clone(),
                Value::Array(parts) => parts
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Result of `POST /test-patterns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub text_length: u64,
    #[serde(default)]
    pub text_sample: String,
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternMatch>,
    #[serde(default)]
    pub extracted_elements: u64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous client, created once per command from the resolved config.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    events: EventLog,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            events: EventLog::disabled(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send every document of a submission to `POST /analyze`.
    ///
    /// Returns the response document as received, ready to be stored.
    pub fn analyze(&self, submission: &Submission) -> Result<Value, ApiError> {
        let mut body = MultipartBody::new();
        for (slot, file) in &submission.documents {
            body.add_file(slot.form_field(), &file.name, &read_file(file)?);
        }

        let raw: Value = self.post_multipart("/analyze", body, decode_json)?;
        if raw.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(ApiError::Rejected(
                error_message(&raw).unwrap_or_else(|| "the service reported a failure".into()),
            ));
        }
        if !raw.is_object() {
            return Err(ApiError::Decode("analysis result is not a JSON object".into()));
        }
        Ok(raw)
    }

    /// `GET /system-status`.
    pub fn system_status(&self) -> Result<SystemStatus, ApiError> {
        self.call("GET", "/system-status", |req| req.call(), decode_json)
    }

    /// `POST /test-patterns` with a single file.
    pub fn test_patterns(&self, file: &AttachedFile) -> Result<PatternReport, ApiError> {
        let mut body = MultipartBody::new();
        body.add_file("file", &file.name, &read_file(file)?);
        self.post_multipart("/test-patterns", body, decode_json)
    }

    /// `POST /debug-document` with a single file. The raw diagnostic JSON is
    /// returned, including `"success": false` answers and their suggestions.
    pub fn debug_document(&self, file: &AttachedFile) -> Result<Value, ApiError> {
        let mut body = MultipartBody::new();
        body.add_file("file", &file.name, &read_file(file)?);
        self.post_multipart("/debug-document", body, decode_json)
    }

    /// `POST /generate-report` with a stored analysis; returns the PDF bytes.
    pub fn generate_report(&self, analysis: &Value) -> Result<Vec<u8>, ApiError> {
        self.call(
            "POST",
            "/generate-report",
            |req| req.send_json(analysis),
            |resp| {
                let mut bytes = Vec::new();
                resp.into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                Ok(bytes)
            },
        )
    }

    fn post_multipart<T>(
        &self,
        endpoint: &str,
        body: MultipartBody,
        read: impl FnOnce(ureq::Response) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let content_type = body.content_type();
        let bytes = body.finish();
        self.call(
            "POST",
            endpoint,
            |req| req.set("Content-Type", &content_type).send_bytes(&bytes),
            read,
        )
    }

    /// Issue one request and log its outcome.
    ///
    /// `send` receives a request already aimed at `endpoint` with the
    /// timeout applied; `read` turns a 2xx response into the result.
    fn call<T>(
        &self,
        method: &str,
        endpoint: &str,
        send: impl FnOnce(ureq::Request) -> Result<ureq::Response, ureq::Error>,
        read: impl FnOnce(ureq::Response) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{endpoint}", self.base_url);
        let request = ureq::request(method, &url).timeout(self.timeout);

        let start = Instant::now();
        let outcome = match send(request) {
            Ok(resp) => {
                let status = resp.status();
                read(resp).map(|v| (status, v)).map_err(|e| (Some(status), e))
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err((
                    Some(status),
                    ApiError::Http {
                        status,
                        message: http_error_message(&body),
                    },
                ))
            }
            Err(other) => Err((None, ApiError::Network(other.to_string()))),
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok((status, value)) => {
                self.events
                    .record_api(ApiEvent::ok(endpoint, status, latency_ms));
                Ok(value)
            }
            Err((status, err)) => {
                self.events.record_api(ApiEvent::failed(
                    endpoint,
                    status,
                    latency_ms,
                    &err.to_string(),
                ));
                Err(err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(file: &AttachedFile) -> Result<Vec<u8>, UploadError> {
    fs::read(&file.path).map_err(|e| UploadError::Unreadable {
        name: file.name.clone(),
        reason: e.to_string(),
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(resp: ureq::Response) -> Result<T, ApiError> {
    resp.into_json().map_err(|e| ApiError::Decode(e.to_string()))
}

/// The `error` (or else `message`) string of a JSON error body.
fn error_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

const MAX_ERROR_BODY_CHARS: usize = 200;

fn http_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body)
        && let Some(message) = error_message(&json)
    {
        return message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn error_message_prefers_error_field() {
        let body = json!({ "error": "bad pdf", "message": "Analysis failed" });
        assert_eq!(error_message(&body).as_deref(), Some("bad pdf"));
        let body = json!({ "error": "", "message": "Analysis failed" });
        assert_eq!(error_message(&body).as_deref(), Some("Analysis failed"));
        assert_eq!(error_message(&json!({})), None);
    }

    #[test]
    fn http_error_message_falls_back_to_body_text() {
        assert_eq!(http_error_message(r#"{"error":"No file uploaded"}"#), "No file uploaded");
        assert_eq!(http_error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(http_error_message(""), "no response body");
        assert_eq!(http_error_message(&"x".repeat(500)).len(), MAX_ERROR_BODY_CHARS);
    }

    #[test]
    fn system_status_tolerates_missing_fields() {
        let status: SystemStatus = serde_json::from_value(json!({ "status": "ready" })).unwrap();
        assert!(status.is_ready());
        assert!(status.pattern_examples.is_empty());
        assert!(!SystemStatus::default().is_ready());
    }

    #[test]
    fn pattern_samples_flatten_groups() {
        let m = PatternMatch {
            found: true,
            count: 2,
            matches: vec![json!("ABCDE1234F"), json!(["Rs.", "", "1,500"])],
        };
        assert_eq!(m.samples(), vec!["ABCDE1234F", "Rs. 1,500"]);
    }

    #[test]
    fn unreachable_service_is_a_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = ApiClient::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(2));
        match client.system_status() {
            Err(ApiError::Network(_)) => {}
            other => panic!("expected network error, got {other:?}"),
        }
    }
}
