// crates/consent-gate-server/src/audit.rs
// ============================================================================
// Module: Consent Gate Request Audit
// Description: Structured audit events for HTTP request handling.
// Purpose: Emit redacted JSON-lines request logs without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every HTTP request produces one [`RequestAuditEvent`]. Events carry the
//! matched route template rather than the concrete path, so customer and
//! dialog identifiers never reach the log; request and response bodies are
//! never recorded. Sinks write one JSON object per line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Redaction label attached to every request event.
pub const REQUEST_REDACTION: &str = "ids_and_text_omitted";

/// Route label used when no route matched the request.
pub const UNMATCHED_ROUTE: &str = "unmatched";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Coarse request outcome derived from the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// 1xx-3xx responses.
    Ok,
    /// 4xx responses.
    ClientError,
    /// 5xx responses.
    ServerError,
}

impl RequestOutcome {
    /// Classifies a numeric HTTP status.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            500.. => Self::ServerError,
            400..=499 => Self::ClientError,
            _ => Self::Ok,
        }
    }
}

/// HTTP request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Matched route template, never the concrete path.
    pub route: String,
    /// Response status code.
    pub status: u16,
    /// Request outcome.
    pub outcome: RequestOutcome,
    /// Error classification when the request failed.
    pub error_kind: Option<&'static str>,
    /// Backend failure detail for server errors only.
    pub error_detail: Option<String>,
    /// Declared request body size in bytes.
    pub request_bytes: Option<u64>,
    /// Handling latency in milliseconds.
    pub latency_ms: u64,
    /// Redaction marker.
    pub redaction: &'static str,
}

/// Inputs for building a request audit event.
pub struct RequestAuditEventParams {
    /// HTTP method.
    pub method: String,
    /// Matched route template when routing succeeded.
    pub route: Option<String>,
    /// Response status code.
    pub status: u16,
    /// Error classification when the request failed.
    pub error_kind: Option<&'static str>,
    /// Backend failure detail for server errors only.
    pub error_detail: Option<String>,
    /// Declared request body size in bytes.
    pub request_bytes: Option<u64>,
    /// Handling latency in milliseconds.
    pub latency_ms: u64,
}

impl RequestAuditEvent {
    /// Builds a new request audit event stamped with the current time.
    #[must_use]
    pub fn new(params: RequestAuditEventParams) -> Self {
        Self {
            event: "http_request",
            timestamp_ms: now_millis(),
            method: params.method,
            route: params.route.unwrap_or_else(|| UNMATCHED_ROUTE.to_string()),
            status: params.status,
            outcome: RequestOutcome::from_status(params.status),
            error_kind: params.error_kind,
            error_detail: params.error_detail,
            request_bytes: params.request_bytes,
            latency_ms: params.latency_ms,
            redaction: REQUEST_REDACTION,
        }
    }
}

/// Server lifecycle audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ServerLifecycleEvent {
    /// Event identifier (`server_started` or `server_stopped`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Bound socket address.
    pub bind: String,
    /// Configured store backend.
    pub store_type: &'static str,
}

impl ServerLifecycleEvent {
    /// Builds a startup event.
    #[must_use]
    pub fn started(bind: String, store_type: &'static str) -> Self {
        Self {
            event: "server_started",
            timestamp_ms: now_millis(),
            bind,
            store_type,
        }
    }

    /// Builds a shutdown event.
    #[must_use]
    pub fn stopped(bind: String, store_type: &'static str) -> Self {
        Self {
            event: "server_stopped",
            timestamp_ms: now_millis(),
            bind,
            store_type,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for request and lifecycle events.
pub trait RequestAuditSink: Send + Sync {
    /// Record a request audit event.
    fn record(&self, event: &RequestAuditEvent);

    /// Record a server lifecycle event.
    fn record_lifecycle(&self, _event: &ServerLifecycleEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl RequestAuditSink for StderrAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        write_stderr_line(event);
    }

    fn record_lifecycle(&self, event: &ServerLifecycleEvent) {
        write_stderr_line(event);
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Serializes one event and appends it as a line.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl RequestAuditSink for FileAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        self.append(event);
    }

    fn record_lifecycle(&self, event: &ServerLifecycleEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl RequestAuditSink for NoopAuditSink {
    fn record(&self, _event: &RequestAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes one serialized event to stderr.
fn write_stderr_line<T: Serialize>(event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(std::io::stderr(), "{payload}");
    }
}

/// Returns milliseconds since the unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use super::FileAuditSink;
    use super::RequestAuditEvent;
    use super::RequestAuditEventParams;
    use super::RequestAuditSink;
    use super::RequestOutcome;
    use super::ServerLifecycleEvent;

    fn sample(status: u16, route: Option<&str>) -> RequestAuditEvent {
        RequestAuditEvent::new(RequestAuditEventParams {
            method: "POST".to_string(),
            route: route.map(str::to_string),
            status,
            error_kind: None,
            error_detail: None,
            request_bytes: Some(42),
            latency_ms: 3,
        })
    }

    #[test]
    fn outcome_follows_status_class() {
        assert_eq!(RequestOutcome::from_status(200), RequestOutcome::Ok);
        assert_eq!(RequestOutcome::from_status(409), RequestOutcome::ClientError);
        assert_eq!(RequestOutcome::from_status(500), RequestOutcome::ServerError);
    }

    #[test]
    fn unmatched_route_is_labelled() {
        assert_eq!(sample(404, None).route, "unmatched");
        assert_eq!(sample(200, Some("/consents/{dialog_id}")).route, "/consents/{dialog_id}");
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).expect("sink");
        sink.record(&sample(200, Some("/health")));
        sink.record_lifecycle(&ServerLifecycleEvent::started("127.0.0.1:8000".to_string(), "memory"));
        let content = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<serde_json::Value> =
            content.lines().map(|line| serde_json::from_str(line).expect("json line")).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "http_request");
        assert_eq!(lines[0]["outcome"], "ok");
        assert_eq!(lines[0]["redaction"], "ids_and_text_omitted");
        assert_eq!(lines[1]["event"], "server_started");
    }
}
