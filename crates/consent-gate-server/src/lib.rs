// crates/consent-gate-server/src/lib.rs
// ============================================================================
// Module: Consent Gate Server Library
// Description: HTTP surface and request audit logging for Consent Gate.
// Purpose: Serve the consent-gated dialog lifecycle over HTTP.
// Dependencies: axum, consent-gate-core, consent-gate-config
// ============================================================================

//! ## Overview
//! This crate hosts the axum HTTP server and its JSON-lines request audit
//! sinks. Configuration comes from `consent-gate-config`; lifecycle semantics
//! live entirely in `consent-gate-core`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RequestAuditEvent;
pub use audit::RequestAuditSink;
pub use audit::RequestOutcome;
pub use audit::ServerLifecycleEvent;
pub use audit::StderrAuditSink;
pub use server::ConsentGateServer;
pub use server::DialogService;
pub use server::ServerError;
pub use server::build_audit_sink;
pub use server::build_service;
