// crates/consent-gate-core/src/lib.rs
// ============================================================================
// Module: Consent Gate Core Library
// Description: Public API surface for the Consent Gate core.
// Purpose: Expose core types, the store interface, and the lifecycle service.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Consent Gate stages per-dialog conversational text until a one-time
//! privacy consent decision arrives, then promotes it to permanent storage or
//! erases it. The core is backend-agnostic; storage plugs in through
//! [`DialogStore`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::DialogStore;
pub use interfaces::StoreError;
pub use runtime::ConsentGate;
pub use runtime::ConsentGateError;
pub use runtime::DEFAULT_ANOMALY_PERIOD;
pub use runtime::InMemoryDialogStore;
pub use runtime::LifecycleConfig;
pub use runtime::SharedDialogStore;
