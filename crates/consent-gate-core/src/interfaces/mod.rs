// crates/consent-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Consent Gate Interfaces
// Description: Storage seam for the consent-gated data lifecycle.
// Purpose: Let the lifecycle service run against any backend that can honor
//          the atomic consent transition.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! [`DialogStore`] is the single backend contract. Implementations own three
//! collections (staging, permanent, consent decisions) and must apply
//! [`DialogStore::record_consent`] atomically: no reader may observe a
//! decision without its promotion or deletion, and a second decision for the
//! same dialog must fail with [`StoreError::Conflict`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AnomalyRecord;
use crate::core::ConsentDecision;
use crate::core::ConsentOutcome;
use crate::core::ConsentRequest;
use crate::core::DataFilter;
use crate::core::DialogId;
use crate::core::NewPendingRecord;
use crate::core::PendingRecord;
use crate::core::PermanentRecord;
use crate::core::UtcTimestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dialog store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("dialog store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("dialog store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("dialog store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("dialog store invalid data: {0}")]
    Invalid(String),
    /// No pending data exists for the dialog.
    #[error("no pending data for dialog {0}")]
    NotFound(DialogId),
    /// A consent decision already exists for the dialog.
    #[error("consent already recorded for dialog {0}")]
    Conflict(DialogId),
    /// Store reported an error.
    #[error("dialog store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Dialog Store
// ============================================================================

/// Persistence contract for staged, permanent, and consent records.
pub trait DialogStore {
    /// Appends a pending record and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the dialog already has a consent
    /// decision, or another [`StoreError`] when the write fails.
    fn insert_pending(&self, record: NewPendingRecord) -> Result<PendingRecord, StoreError>;

    /// Applies a consent decision to every pending row of its dialog.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when a decision already exists,
    /// [`StoreError::NotFound`] when no pending rows exist, or another
    /// [`StoreError`] when the transaction fails. Nothing is applied on error.
    fn record_consent(&self, request: ConsentRequest) -> Result<ConsentOutcome, StoreError>;

    /// Lists permanent records matching `filter` in canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn list_permanent(&self, filter: &DataFilter) -> Result<Vec<PermanentRecord>, StoreError>;

    /// Lists undecided pending rows received strictly before `cutoff`,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn list_anomalies(&self, cutoff: UtcTimestamp) -> Result<Vec<AnomalyRecord>, StoreError>;

    /// Returns the pending rows for a dialog in id order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn pending_for(&self, dialog_id: &DialogId) -> Result<Vec<PendingRecord>, StoreError>;

    /// Returns the consent decision for a dialog, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn consent_for(&self, dialog_id: &DialogId) -> Result<Option<ConsentDecision>, StoreError>;

    /// Checks that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot serve requests.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
