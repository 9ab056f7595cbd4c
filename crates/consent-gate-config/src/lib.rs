// crates/consent-gate-config/src/lib.rs
// ============================================================================
// Module: Consent Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for consent-gate.toml semantics.
// Dependencies: consent-gate-core, consent-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `consent-gate-config` defines the configuration model for the Consent Gate
//! service. Loading is strict and fail-closed: unknown store types, zero
//! limits, unparsable bind addresses, and malformed CORS origins are rejected
//! before anything is started.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
