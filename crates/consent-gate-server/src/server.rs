// crates/consent-gate-server/src/server.rs
// ============================================================================
// Module: Consent Gate HTTP Server
// Description: axum router, handlers, and lifecycle for the HTTP surface.
// Purpose: Expose intake, consent, listing, and anomaly reporting over HTTP.
// Dependencies: axum, consent-gate-config, consent-gate-core, tokio, tower-http
// ============================================================================

//! ## Overview
//! [`ConsentGateServer`] wires a validated [`ConsentGateConfig`] to a dialog
//! store and serves the HTTP surface with axum. Request bodies are parsed
//! from raw bytes so malformed JSON maps to 422 with a `{"detail": ...}` body
//! instead of the extractor's default rejection. Storage calls run on the
//! blocking pool.
//!
//! Every request passes through the audit middleware, which records the
//! matched route template, status and latency but never bodies or path values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use axum::extract::Path as UrlPath;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_LENGTH;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use consent_gate_config::ConsentGateConfig;
use consent_gate_config::ServerAuditConfig;
use consent_gate_config::StoreConfig;
use consent_gate_config::StoreType;
use consent_gate_core::AnomalyRecord;
use consent_gate_core::ConsentDecision;
use consent_gate_core::ConsentGate;
use consent_gate_core::ConsentGateError;
use consent_gate_core::DataQuery;
use consent_gate_core::DialogId;
use consent_gate_core::DialogSubmission;
use consent_gate_core::InMemoryDialogStore;
use consent_gate_core::PendingRecord;
use consent_gate_core::PermanentRecord;
use consent_gate_core::SharedDialogStore;
use consent_gate_core::ValidationError;
use consent_gate_store_sqlite::SqliteDialogStore;
use serde::Deserialize;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::AllowHeaders;
use tower_http::cors::AllowMethods;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;

use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::RequestAuditEvent;
use crate::audit::RequestAuditEventParams;
use crate::audit::RequestAuditSink;
use crate::audit::ServerLifecycleEvent;
use crate::audit::StderrAuditSink;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle service bound to the configured store.
pub type DialogService = ConsentGate<SharedDialogStore>;

/// Consent Gate HTTP server instance.
pub struct ConsentGateServer {
    /// Validated configuration.
    config: ConsentGateConfig,
    /// Shared request handling state.
    state: Arc<ServerState>,
    /// CORS layer when origins are configured.
    cors: Option<CorsLayer>,
}

/// Shared state for request handlers.
struct ServerState {
    /// Lifecycle service.
    service: DialogService,
    /// Request audit sink.
    audit: Arc<dyn RequestAuditSink>,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
}

impl ConsentGateServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid, the store
    /// cannot be opened, or the audit log cannot be created.
    pub fn from_config(config: ConsentGateConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let service = build_service(&config)?;
        let audit = build_audit_sink(&config.server.audit)?;
        Self::from_parts(config, service, audit)
    }

    /// Builds a server around an existing service and audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when a CORS origin is not a valid
    /// header value.
    pub fn from_parts(
        config: ConsentGateConfig,
        service: DialogService,
        audit: Arc<dyn RequestAuditSink>,
    ) -> Result<Self, ServerError> {
        let cors = build_cors_layer(&config.server.cors_allowed_origins)?;
        let state = Arc::new(ServerState {
            service,
            audit,
            max_body_bytes: config.server.max_body_bytes,
        });
        Ok(Self {
            config,
            state,
            cors,
        })
    }

    /// Returns the lifecycle service backing this server.
    #[must_use]
    pub fn service(&self) -> &DialogService {
        &self.state.service
    }

    /// Returns the axum router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state), self.cors.clone())
    }

    /// Binds the configured address and serves until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the server fails.
    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let bind = listener
            .local_addr()
            .map_or_else(|_| self.config.server.bind.clone(), |addr| addr.to_string());
        let store_type = store_type_label(self.config.store.store_type);
        let app = self.router();
        self.state.audit.record_lifecycle(&ServerLifecycleEvent::started(bind.clone(), store_type));
        let result = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")));
        self.state.audit.record_lifecycle(&ServerLifecycleEvent::stopped(bind, store_type));
        result
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the lifecycle service for a configuration.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the store cannot be opened.
pub fn build_service(config: &ConsentGateConfig) -> Result<DialogService, ServerError> {
    let store = build_dialog_store(&config.store)?;
    Ok(ConsentGate::new(store, config.reporting.lifecycle_config()))
}

/// Builds the configured dialog store.
fn build_dialog_store(config: &StoreConfig) -> Result<SharedDialogStore, ServerError> {
    match config.store_type {
        StoreType::Memory => Ok(SharedDialogStore::from_store(InMemoryDialogStore::new())),
        StoreType::Sqlite => {
            let sqlite_config = config
                .sqlite_config()
                .ok_or_else(|| ServerError::Config("sqlite store requires path".to_string()))?;
            let store = SqliteDialogStore::new(sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(SharedDialogStore::from_store(store))
        }
    }
}

/// Builds the configured request audit sink.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the audit log file cannot be opened.
pub fn build_audit_sink(
    config: &ServerAuditConfig,
) -> Result<Arc<dyn RequestAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Builds a credentialed CORS layer for the listed origins.
fn build_cors_layer(origins: &[String]) -> Result<Option<CorsLayer>, ServerError> {
    if origins.is_empty() {
        return Ok(None);
    }
    let values = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| ServerError::Config(format!("invalid cors origin: {origin}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);
    Ok(Some(layer))
}

/// Builds the HTTP router.
fn build_router(state: Arc<ServerState>, cors: Option<CorsLayer>) -> Router {
    let max_body_bytes = state.max_body_bytes;
    let router = Router::new()
        .route("/data", get(handle_list_data))
        .route("/data/anomaly", get(handle_list_anomalies))
        .route("/data/{customer_id}/{dialog_id}", post(handle_submit_data))
        .route("/consents/{dialog_id}", post(handle_record_consent).get(handle_get_consent))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(middleware::from_fn_with_state(Arc::clone(&state), audit_requests))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state);
    match cors {
        Some(layer) => router.layer(layer),
        None => router,
    }
}

/// Returns the audit label for a store backend.
const fn store_type_label(store_type: StoreType) -> &'static str {
    match store_type {
        StoreType::Memory => "memory",
        StoreType::Sqlite => "sqlite",
    }
}

/// Resolves on Ctrl-C; never resolves when the signal cannot be installed.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `POST /data/{customer_id}/{dialog_id}`.
async fn handle_submit_data(
    State(state): State<Arc<ServerState>>,
    path: Result<UrlPath<(String, String)>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PendingRecord>, ApiError> {
    let UrlPath((customer_id, dialog_id)) = path.map_err(ApiError::from_path_rejection)?;
    let bytes = body.map_err(|rejection| ApiError::from_body_rejection(&rejection, &state))?;
    let payload = parse_intake_body(&bytes)?;
    let submission =
        DialogSubmission::new(customer_id, dialog_id, payload.text, &payload.language)?;
    let record = run_blocking(&state, move |service| service.submit_data(submission)).await?;
    Ok(Json(record))
}

/// Handles `GET /data`.
async fn handle_list_data(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<PermanentRecord>>, ApiError> {
    let Query(params) = params.map_err(|rejection| {
        ApiError::from(ValidationError::InvalidPayload(rejection.body_text()))
    })?;
    let query = params.into_query()?;
    let records = run_blocking(&state, move |service| service.list_data(&query)).await?;
    Ok(Json(records))
}

/// Handles `GET /data/anomaly`.
async fn handle_list_anomalies(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Vec<AnomalyRecord>>, ApiError> {
    let anomalies = run_blocking(&state, |service| service.list_current_anomalies()).await?;
    Ok(Json(anomalies))
}

/// Handles `POST /consents/{dialog_id}`.
async fn handle_record_consent(
    State(state): State<Arc<ServerState>>,
    path: Result<UrlPath<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ConsentDecision>, ApiError> {
    let UrlPath(dialog_id) = path.map_err(ApiError::from_path_rejection)?;
    let bytes = body.map_err(|rejection| ApiError::from_body_rejection(&rejection, &state))?;
    let has_given_consent = parse_consent_body(&bytes)?;
    if dialog_id.is_empty() {
        return Err(ValidationError::EmptyField("dialog_id").into());
    }
    let dialog_id = DialogId::new(dialog_id);
    let outcome =
        run_blocking(&state, move |service| service.record_consent(dialog_id, has_given_consent))
            .await?;
    Ok(Json(outcome.decision))
}

/// Handles `GET /consents/{dialog_id}`.
async fn handle_get_consent(
    State(state): State<Arc<ServerState>>,
    path: Result<UrlPath<String>, PathRejection>,
) -> Result<Json<ConsentDecision>, ApiError> {
    let UrlPath(dialog_id) = path.map_err(ApiError::from_path_rejection)?;
    let dialog_id = DialogId::new(dialog_id);
    let lookup = dialog_id.clone();
    let decision = run_blocking(&state, move |service| service.consent_for(&lookup)).await?;
    decision.map(Json).ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no consent recorded for dialog {dialog_id}"),
        )
    })
}

/// Handles `GET /health`.
async fn handle_health(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<&'static str>, ApiError> {
    run_blocking(&state, |service| service.readiness()).await?;
    Ok(Json("Ok"))
}

/// Handles requests that match no route.
async fn handle_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", "Not Found".to_string())
}

/// Runs a lifecycle operation on the blocking pool.
async fn run_blocking<T, F>(state: &ServerState, operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&DialogService) -> Result<T, ConsentGateError> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || operation(&service))
        .await
        .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))?
        .map_err(ApiError::from)
}

// ============================================================================
// SECTION: Audit Middleware
// ============================================================================

/// Records one audit event per request.
async fn audit_requests(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().as_str().to_string();
    let route =
        request.extensions().get::<MatchedPath>().map(|matched| matched.as_str().to_string());
    let request_bytes = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let response = next.run(request).await;
    let tag = response.extensions().get::<ErrorTag>().cloned();
    let event = RequestAuditEvent::new(RequestAuditEventParams {
        method,
        route,
        status: response.status().as_u16(),
        error_kind: tag.as_ref().map(|tag| tag.kind),
        error_detail: tag.and_then(|tag| tag.internal),
        request_bytes,
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    });
    state.audit.record(&event);
    response
}

// ============================================================================
// SECTION: Request Payloads
// ============================================================================

/// Intake request body.
#[derive(Debug, Deserialize)]
struct IntakeBody {
    /// Conversational text.
    text: String,
    /// Language tag in any casing.
    language: String,
}

/// Consent request body: an object or a bare boolean.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConsentBody {
    /// Bare JSON boolean.
    Flag(bool),
    /// Object form.
    Object {
        /// Consent decision.
        has_given_consent: bool,
    },
}

/// Raw query parameters for `GET /data`.
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    /// Language filter.
    language: Option<String>,
    /// Customer filter.
    #[serde(rename = "customerId", alias = "customer_id")]
    customer_id: Option<String>,
    /// Leading rows to drop.
    skip: Option<String>,
    /// Maximum rows to return.
    limit: Option<String>,
}

impl ListParams {
    /// Converts raw parameters into a data query, parsing integers.
    fn into_query(self) -> Result<DataQuery, ValidationError> {
        Ok(DataQuery {
            language: self.language,
            customer_id: self.customer_id,
            skip: parse_optional_int("skip", self.skip.as_deref())?,
            limit: parse_optional_int("limit", self.limit.as_deref())?,
        })
    }
}

/// Parses an optional integer query value; blank means absent.
fn parse_optional_int(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<i64>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<i64>().map(Some).map_err(|_| ValidationError::InvalidNumber {
            field,
        }),
    }
}

/// Decodes an intake body.
fn parse_intake_body(bytes: &[u8]) -> Result<IntakeBody, ValidationError> {
    serde_json::from_slice(bytes).map_err(|err| ValidationError::InvalidPayload(err.to_string()))
}

/// Decodes a consent body into the decision flag.
fn parse_consent_body(bytes: &[u8]) -> Result<bool, ValidationError> {
    let body: ConsentBody = serde_json::from_slice(bytes).map_err(|_| {
        ValidationError::InvalidPayload(
            "expected a boolean or {\"has_given_consent\": <bool>}".to_string(),
        )
    })?;
    Ok(match body {
        ConsentBody::Flag(value)
        | ConsentBody::Object {
            has_given_consent: value,
        } => value,
    })
}

// ============================================================================
// SECTION: Error Responses
// ============================================================================

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Human-readable error message.
    detail: String,
}

/// Error classification attached to responses for the audit middleware.
#[derive(Debug, Clone)]
struct ErrorTag {
    /// Error kind label.
    kind: &'static str,
    /// Backend detail withheld from the client.
    internal: Option<String>,
}

/// HTTP error response.
#[derive(Debug)]
struct ApiError {
    /// Response status.
    status: StatusCode,
    /// Error kind label.
    kind: &'static str,
    /// Client-facing message.
    detail: String,
    /// Backend detail withheld from the client.
    internal: Option<String>,
}

impl ApiError {
    /// Builds a client-facing error.
    const fn new(status: StatusCode, kind: &'static str, detail: String) -> Self {
        Self {
            status,
            kind,
            detail,
            internal: None,
        }
    }

    /// Builds a 500 error whose detail is only recorded in the audit log.
    fn internal(detail: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "storage",
            detail: "internal storage error".to_string(),
            internal: Some(detail),
        }
    }

    /// Maps a path extraction failure.
    fn from_path_rejection(rejection: PathRejection) -> Self {
        Self::from(ValidationError::InvalidPayload(rejection.body_text()))
    }

    /// Maps a body extraction failure, including the size limit.
    fn from_body_rejection(rejection: &BytesRejection, state: &ServerState) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                format!("request body exceeds {} bytes", state.max_body_bytes),
            );
        }
        Self::new(rejection.status(), "invalid_body", rejection.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", err.to_string())
    }
}

impl From<ConsentGateError> for ApiError {
    fn from(err: ConsentGateError) -> Self {
        match err {
            ConsentGateError::Validation(err) => Self::from(err),
            ConsentGateError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            ConsentGateError::Conflict(_) => {
                Self::new(StatusCode::CONFLICT, "conflict", err.to_string())
            }
            ConsentGateError::Storage(err) => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(ErrorBody {
                detail: self.detail,
            }),
        )
            .into_response();
        response.extensions_mut().insert(ErrorTag {
            kind: self.kind,
            internal: self.internal,
        });
        response
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
