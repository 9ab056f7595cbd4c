// crates/consent-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Consent Gate Runtime
// Description: Lifecycle service and in-memory store.
// Purpose: Execute the consent-gated lifecycle against any dialog store.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules hold the lifecycle service used by every surface and the
//! in-memory backend used by tests and the `memory` store type.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod lifecycle;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use lifecycle::ConsentGate;
pub use lifecycle::ConsentGateError;
pub use lifecycle::DEFAULT_ANOMALY_PERIOD;
pub use lifecycle::LifecycleConfig;
pub use store::InMemoryDialogStore;
pub use store::SharedDialogStore;
