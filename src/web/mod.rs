//! Local JSON dashboard server.
//!
//! A small synchronous HTTP server (via `tiny_http`) exposing the history
//! and dashboard statistics to other local tools:
//! - `GET /api/stats`, `GET /api/history`, `GET /api/history/<id>`
//! - `GET /api/export`, `POST /api/history/clear?confirm=true`
//! - `GET /api/slots`, `GET /api/health`
//!
//! Launched via `govdoc serve` (default: `http://127.0.0.1:9747`). While it
//! runs, the backend's status is polled in the background for `/api/health`.

mod api;

use std::io::Cursor;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::analytics::events::EventLog;
use crate::api::{ApiClient, StatusPoller};
use crate::config::GovDocConfig;
use crate::history::{DirStorage, HistoryStore, KeyValueStorage};

// ---------------------------------------------------------------------------
// Server state
// ---------------------------------------------------------------------------

/// Everything the handlers read from.
pub struct WebState<S: KeyValueStorage = DirStorage> {
    pub history: HistoryStore<S>,
    pub poller: Option<StatusPoller>,
    pub api_base_url: String,
}

impl<S: KeyValueStorage> WebState<S> {
    /// State without a status poller.
    pub fn new(history: HistoryStore<S>, api_base_url: impl Into<String>) -> Self {
        Self {
            history,
            poller: None,
            api_base_url: api_base_url.into(),
        }
    }

    pub fn with_poller(mut self, poller: StatusPoller) -> Self {
        self.poller = Some(poller);
        self
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on the given address.
///
/// Blocks the current thread. Requests are handled sequentially, and a
/// failing request gets a JSON 500 without stopping the server.
pub fn serve(config: &GovDocConfig, addr: &str) -> Result<()> {
    let events = EventLog::from_config(&config.logging);
    let client = ApiClient::from_config(&config.api).with_events(events);
    let interval = Duration::from_secs(config.api.status_poll_secs.max(1));
    let mut state = WebState::new(HistoryStore::open(config)?, client.base_url())
        .with_poller(StatusPoller::spawn(client, interval));

    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("govdoc dashboard API running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        // Drain any body so the connection can be reused; no route reads it.
        if matches!(method, Method::Post | Method::Put) {
            let _ = std::io::copy(request.as_reader(), &mut std::io::sink());
        }

        let reply = dispatch(&mut state, &method, &url)
            .unwrap_or_else(|e| Reply::error(500, &e.to_string()));
        let status = reply.status;
        let _ = request.respond(reply.into_response());

        println!(
            "{} {} {} {}",
            method,
            url,
            status,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Route one request to its handler.
pub fn dispatch<S: KeyValueStorage>(
    state: &mut WebState<S>,
    method: &Method,
    url: &str,
) -> Result<Reply> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/api/stats") => api::get_stats(state),
        (&Method::Get, "/api/history") => api::get_history(state, url),
        (&Method::Get, "/api/export") => api::get_export(state),
        (&Method::Post, "/api/history/clear") => api::post_clear(state, url),
        (&Method::Get, "/api/slots") => api::get_slots(),
        (&Method::Get, "/api/health") => api::get_health(state),
        (&Method::Get, p) => match p.strip_prefix("/api/history/") {
            Some(id) if !id.is_empty() && !id.contains('/') => api::get_analysis(state, id),
            _ => Ok(Reply::not_found()),
        },
        _ => Ok(Reply::not_found()),
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// A handler's answer, turned into a `tiny_http` response at the edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    /// Offer the body as a file download under this name.
    pub download_name: Option<String>,
}

impl Reply {
    pub fn json<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self {
            status: 200,
            body: serde_json::to_string(data)?,
            download_name: None,
        })
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
            download_name: None,
        }
    }

    pub fn not_found() -> Self {
        Self::error(404, "not found")
    }

    pub fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let mut response = Response::from_data(self.body.into_bytes())
            .with_header(content_type_json())
            .with_status_code(StatusCode(self.status));
        if let Some(name) = self.download_name
            && let Ok(header) = Header::from_bytes(
                "Content-Disposition",
                format!("attachment; filename=\"{name}\""),
            )
        {
            response = response.with_header(header);
        }
        response
    }
}

/// JSON content type header.
fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
