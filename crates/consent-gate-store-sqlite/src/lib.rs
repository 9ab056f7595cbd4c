// crates/consent-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Dialog Store
// Description: Durable DialogStore backend using SQLite WAL.
// Purpose: Provide production persistence for the consent-gated lifecycle.
// Dependencies: consent-gate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`DialogStore`] implementation. The
//! consent transition runs as one immediate transaction guarded by a UNIQUE
//! constraint on the consent table, so it stays correct across processes that
//! share a database file.
//!
//! [`DialogStore`]: consent_gate_core::DialogStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SCHEMA_VERSION;
pub use store::SqliteDialogStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
