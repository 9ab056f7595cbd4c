// crates/consent-gate-server/tests/common/mod.rs
// ============================================================================
// Module: HTTP Test Harness
// Description: Spawns the HTTP server on an ephemeral port for tests.
// Purpose: Share server setup, clocks, and audit capture across HTTP tests.
// Dependencies: consent-gate-server, tokio
// ============================================================================

//! ## Overview
//! Each test gets its own server bound to `127.0.0.1:0`, an in-memory or
//! `SQLite` store, a manual clock, and a capturing audit sink. Shutdown is
//! driven by a oneshot channel.

use std::sync::Arc;
use std::sync::Mutex;

use consent_gate_config::ConsentGateConfig;
use consent_gate_core::ConsentGate;
use consent_gate_core::InMemoryDialogStore;
use consent_gate_core::ManualClock;
use consent_gate_core::SharedDialogStore;
use consent_gate_core::UtcTimestamp;
use consent_gate_server::ConsentGateServer;
use consent_gate_server::DialogService;
use consent_gate_server::RequestAuditEvent;
use consent_gate_server::RequestAuditSink;
use consent_gate_server::ServerError;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Fixed start instant for manual clocks (2024-01-01T00:00:00Z).
pub const START_MILLIS: i64 = 1_704_067_200_000;

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct CaptureAuditSink {
    events: Mutex<Vec<RequestAuditEvent>>,
}

impl CaptureAuditSink {
    /// Returns a snapshot of recorded events.
    pub fn events(&self) -> Vec<RequestAuditEvent> {
        self.events.lock().expect("audit lock").clone()
    }
}

impl RequestAuditSink for CaptureAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }
}

/// Running server handle.
pub struct TestServer {
    /// Base URL such as `http://127.0.0.1:40000`.
    pub base_url: String,
    /// HTTP client.
    pub client: reqwest::Client,
    /// Lifecycle service behind the server, for direct state checks.
    pub service: DialogService,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Returns an absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Stops the server and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.expect("server task").expect("server result");
    }
}

/// Spawns an already built server on an ephemeral port.
pub async fn spawn(server: ConsentGateServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let service = server.service().clone();
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_shutdown(listener, async move {
        let _ = rx.await;
    }));
    TestServer {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        service,
        shutdown: Some(tx),
        handle,
    }
}

/// Spawns an in-memory server with a manual clock and capturing audit sink.
pub async fn spawn_memory(
    config: ConsentGateConfig,
) -> (TestServer, ManualClock, Arc<CaptureAuditSink>) {
    let clock = ManualClock::new(UtcTimestamp::from_unix_millis(START_MILLIS));
    let store = SharedDialogStore::from_store(InMemoryDialogStore::new());
    let service =
        ConsentGate::with_clock(store, config.reporting.lifecycle_config(), Arc::new(clock.clone()));
    let audit = Arc::new(CaptureAuditSink::default());
    let sink: Arc<dyn RequestAuditSink> = audit.clone();
    let server = ConsentGateServer::from_parts(config, service, sink).expect("server");
    (spawn(server).await, clock, audit)
}

/// Default test configuration with audit logging disabled.
pub fn quiet_config() -> ConsentGateConfig {
    let mut config = ConsentGateConfig::default();
    config.server.audit.enabled = false;
    config
}
