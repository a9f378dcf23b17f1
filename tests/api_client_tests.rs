//! HTTP client tests against a loopback `tiny_http` server.
//!
//! Each test starts a server that answers a fixed list of canned responses
//! and hands every request it saw back over a channel.
use std::io::Read;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use govdoc::analytics::events::{EventLog, LogLine};
use govdoc::api::{ApiClient, ApiError};
use govdoc::upload::{AttachedFile, DocumentSlot, UploadSession};
use serde_json::{Value, json};
use tiny_http::{Response, Server, StatusCode};

struct Seen {
    method: String,
    url: String,
    content_type: String,
    body: Vec<u8>,
}

fn spawn_server(responses: Vec<(u16, Vec<u8>)>) -> (String, Receiver<Seen>, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let base = format!("http://{}", server.server_addr());
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        for (status, body) in responses {
            let Ok(mut req) = server.recv() else { break };
            let mut buf = Vec::new();
            let _ = req.as_reader().read_to_end(&mut buf);
            let content_type = req
                .headers()
                .iter()
                .find(|h| h.field.equiv("Content-Type"))
                .map(|h| h.value.as_str().to_string())
                .unwrap_or_default();
            let _ = tx.send(Seen {
                method: req.method().to_string(),
                url: req.url().to_string(),
                content_type,
                body: buf,
            });
            let _ = req.respond(Response::from_data(body).with_status_code(StatusCode(status)));
        }
    });
    (base, rx, handle)
}

fn json_body(value: Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

fn client(base: &str) -> ApiClient {
    ApiClient::new(base, Duration::from_secs(10))
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> AttachedFile {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    AttachedFile::from_path(&path).unwrap()
}

fn full_session(dir: &Path) -> UploadSession {
    let mut session = UploadSession::default();
    for slot in DocumentSlot::ALL {
        let file = write_file(dir, &format!("{}.pdf", slot.key()), slot.key().as_bytes());
        session.attach(slot, file).unwrap();
    }
    session
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

#[test]
fn analyze_posts_every_slot_as_multipart() {
    let dir = tempfile::tempdir().unwrap();
    let submission = full_session(dir.path()).submit().unwrap();
    let (base, seen, handle) = spawn_server(vec![(
        200,
        json_body(json!({
            "success": true,
            "analysis": { "decision": "APPROVE", "confidence": 0.93 },
            "compliance_score": 95,
            "document_count": 5
        })),
    )]);

    let raw = client(&base).analyze(&submission).unwrap();
    assert_eq!(raw["analysis"]["decision"], "APPROVE");

    let req = seen.recv().unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.url, "/analyze");
    assert!(req.content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8(req.body).unwrap();
    for slot in DocumentSlot::ALL {
        assert!(body.contains(&format!(
            "name=\"{}\"; filename=\"{}.pdf\"",
            slot.form_field(),
            slot.key()
        )));
    }
    assert!(body.contains("Content-Type: application/pdf"));
    handle.join().unwrap();
}

#[test]
fn analyze_with_success_false_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let submission = full_session(dir.path()).submit().unwrap();
    let (base, _seen, handle) = spawn_server(vec![(
        200,
        json_body(json!({ "success": false, "error": "AI analysis failed" })),
    )]);

    match client(&base).analyze(&submission) {
        Err(ApiError::Rejected(message)) => assert_eq!(message, "AI analysis failed"),
        other => panic!("expected rejection, got {other:?}"),
    }
    handle.join().unwrap();
}

#[test]
fn server_error_carries_status_and_message() {
    let dir = tempfile::tempdir().unwrap();
    let submission = full_session(dir.path()).submit().unwrap();
    let (base, _seen, handle) = spawn_server(vec![(
        500,
        json_body(json!({
            "success": false,
            "error": "PDF is password-protected",
            "message": "Analysis failed. Please check document format and try again."
        })),
    )]);

    let err = client(&base).analyze(&submission).unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "HTTP error 500: PDF is password-protected");
    handle.join().unwrap();
}

#[test]
fn missing_file_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let session = full_session(dir.path());
    let submission = session.submit().unwrap();
    std::fs::remove_file(dir.path().join("udyam.pdf")).unwrap();

    let err = client("http://127.0.0.1:1").analyze(&submission).unwrap_err();
    assert!(matches!(err, ApiError::Upload(_)), "{err:?}");
}

// ---------------------------------------------------------------------------
// Other endpoints
// ---------------------------------------------------------------------------

#[test]
fn system_status_is_a_get() {
    let (base, seen, handle) = spawn_server(vec![(
        200,
        json_body(json!({
            "status": "ready",
            "accuracy": "99.99%",
            "ocr_support": true,
            "local_model": "loaded",
            "pattern_examples": { "pan": "ABCDE1234F" }
        })),
    )]);

    let status = client(&base).system_status().unwrap();
    assert!(status.is_ready());
    assert_eq!(status.ocr_support, Some(true));
    assert_eq!(status.pattern_examples["pan"], "ABCDE1234F");

    let req = seen.recv().unwrap();
    assert_eq!(req.method, "GET");
    assert_eq!(req.url, "/system-status");
    handle.join().unwrap();
}

#[test]
fn test_patterns_sends_single_file_field() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "pan.png", b"png-bytes");
    let (base, seen, handle) = spawn_server(vec![(
        200,
        json_body(json!({
            "success": true,
            "filename": "pan.png",
            "text_length": 42,
            "patterns": {
                "PAN": { "found": true, "count": 1, "matches": ["ABCDE1234F"] },
                "GST": { "found": false, "count": 0, "matches": [] }
            },
            "extracted_elements": 3
        })),
    )]);

    let report = client(&base).test_patterns(&file).unwrap();
    assert_eq!(report.text_length, 42);
    assert!(report.patterns["PAN"].found);
    assert!(!report.patterns["GST"].found);

    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/test-patterns");
    let body = String::from_utf8(req.body).unwrap();
    assert!(body.contains("name=\"file\"; filename=\"pan.png\""));
    assert!(body.contains("Content-Type: image/png"));
    handle.join().unwrap();
}

#[test]
fn debug_document_returns_unsuccessful_answers() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "scan.pdf", b"%PDF");
    let (base, _seen, handle) = spawn_server(vec![(
        200,
        json_body(json!({
            "success": false,
            "error": "No text extracted",
            "suggestions": ["File might be image-only PDF"]
        })),
    )]);

    let info = client(&base).debug_document(&file).unwrap();
    assert_eq!(info["error"], "No text extracted");
    handle.join().unwrap();
}

#[test]
fn generate_report_posts_json_and_returns_bytes() {
    let record = json!({ "analysis": { "decision": "REJECT" }, "compliance_score": 20 });
    let pdf = b"%PDF-1.7 fake report".to_vec();
    let (base, seen, handle) = spawn_server(vec![(200, pdf.clone())]);

    let bytes = client(&base).generate_report(&record).unwrap();
    assert_eq!(bytes, pdf);

    let req = seen.recv().unwrap();
    assert_eq!(req.url, "/generate-report");
    assert!(req.content_type.starts_with("application/json"));
    let sent: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(sent, record);
    handle.join().unwrap();
}

#[test]
fn undecodable_body_is_a_decode_error() {
    let (base, _seen, handle) = spawn_server(vec![(200, b"<html>oops</html>".to_vec())]);
    let err = client(&base).system_status().unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "{err:?}");
    handle.join().unwrap();
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

#[test]
fn every_call_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log = EventLog::at(dir.path().join("events.jsonl"));
    let (base, _seen, handle) = spawn_server(vec![
        (200, json_body(json!({ "status": "ready" }))),
        (503, b"Service Unavailable".to_vec()),
    ]);
    let client = client(&base).with_events(log.clone());

    client.system_status().unwrap();
    let err = client.system_status().unwrap_err();
    assert_eq!(err.to_string(), "HTTP error 503: Service Unavailable");
    handle.join().unwrap();

    let lines = log.read_all();
    assert_eq!(lines.len(), 2);
    match (&lines[0], &lines[1]) {
        (LogLine::Api(ok), LogLine::Api(failed)) => {
            assert_eq!(ok.endpoint, "/system-status");
            assert_eq!(ok.outcome, "ok");
            assert_eq!(ok.status, Some(200));
            assert_eq!(failed.outcome, "error");
            assert_eq!(failed.status, Some(503));
        }
        other => panic!("unexpected log lines: {other:?}"),
    }
}
