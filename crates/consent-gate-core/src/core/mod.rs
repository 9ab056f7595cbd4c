// crates/consent-gate-core/src/core/mod.rs
// ============================================================================
// Module: Consent Gate Core Types
// Description: Identifiers, records, queries, and time primitives.
// Purpose: Provide the serializable vocabulary shared by stores and surfaces.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Core types describe every stage of a dialog's data lifecycle. They carry no
//! storage or transport concerns; the HTTP surface and both stores serialize
//! the same shapes.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod query;
pub mod records;
pub mod time;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::CustomerId;
pub use identifiers::DialogId;
pub use identifiers::RecordId;
pub use query::DataFilter;
pub use query::DataQuery;
pub use query::newest_first;
pub use records::AnomalyRecord;
pub use records::ConsentDecision;
pub use records::ConsentOutcome;
pub use records::ConsentRequest;
pub use records::DialogSubmission;
pub use records::Language;
pub use records::NewPendingRecord;
pub use records::PendingRecord;
pub use records::PermanentRecord;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;
pub use time::UtcTimestamp;
pub use validation::ValidationError;
