// crates/consent-gate-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Consent Gate Lifecycle Service
// Description: Intake, consent transition, listing, and anomaly reporting.
// Purpose: Single entry point that every surface (HTTP, CLI, tests) calls into.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! [`ConsentGate`] validates inputs, stamps times from its [`Clock`], and
//! delegates to a [`DialogStore`]. Per dialog the lifecycle is
//! `NoData -> Pending -> {Promoted | Discarded}`; the consent transition is
//! single-fire and intake for an already decided dialog is rejected with
//! [`ConsentGateError::Conflict`].
//!
//! Validation always happens before the store is touched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::AnomalyRecord;
use crate::core::Clock;
use crate::core::ConsentDecision;
use crate::core::ConsentOutcome;
use crate::core::ConsentRequest;
use crate::core::DataQuery;
use crate::core::DialogId;
use crate::core::DialogSubmission;
use crate::core::NewPendingRecord;
use crate::core::PendingRecord;
use crate::core::PermanentRecord;
use crate::core::SystemClock;
use crate::core::UtcTimestamp;
use crate::core::ValidationError;
use crate::interfaces::DialogStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default age after which an undecided pending row is reported.
pub const DEFAULT_ANOMALY_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifecycle service settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Age past which undecided pending rows are anomalies.
    pub anomaly_period: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            anomaly_period: DEFAULT_ANOMALY_PERIOD,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Lifecycle operation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsentGateError {
    /// Input was rejected before storage was touched.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No pending data exists for the dialog.
    #[error("no pending data for dialog {0}")]
    NotFound(DialogId),
    /// The dialog already has a consent decision.
    #[error("consent already recorded for dialog {0}")]
    Conflict(DialogId),
    /// The backend failed; no partial state was left behind.
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for ConsentGateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(dialog_id) => Self::NotFound(dialog_id),
            StoreError::Conflict(dialog_id) => Self::Conflict(dialog_id),
            other => Self::Storage(other),
        }
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Consent-gated dialog data lifecycle service.
#[derive(Clone)]
pub struct ConsentGate<S> {
    /// Backing store.
    store: S,
    /// Time source for intake and decision stamps.
    clock: Arc<dyn Clock>,
    /// Service settings.
    config: LifecycleConfig,
}

impl<S: DialogStore> ConsentGate<S> {
    /// Creates a service using wall-clock time.
    #[must_use]
    pub fn new(store: S, config: LifecycleConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates a service with an explicit time source.
    #[must_use]
    pub fn with_clock(store: S, config: LifecycleConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Returns the service settings.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Stages dialog text until a consent decision arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentGateError::Conflict`] when the dialog is already
    /// decided, or [`ConsentGateError::Storage`] when the write fails.
    pub fn submit_data(
        &self,
        submission: DialogSubmission,
    ) -> Result<PendingRecord, ConsentGateError> {
        let record = NewPendingRecord::from_submission(submission, self.clock.now());
        Ok(self.store.insert_pending(record)?)
    }

    /// Records the one-time consent decision for a dialog and promotes or
    /// discards its pending rows.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentGateError::Conflict`] when a decision exists,
    /// [`ConsentGateError::NotFound`] when nothing is pending, or
    /// [`ConsentGateError::Storage`] when the transaction fails.
    pub fn record_consent(
        &self,
        dialog_id: DialogId,
        has_given_consent: bool,
    ) -> Result<ConsentOutcome, ConsentGateError> {
        let request = ConsentRequest {
            dialog_id,
            has_given_consent,
            received_at: self.clock.now(),
        };
        Ok(self.store.record_consent(request)?)
    }

    /// Lists permanent records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentGateError::Validation`] for a negative `skip` or a
    /// non-positive `limit`, or [`ConsentGateError::Storage`] on read failure.
    pub fn list_data(&self, query: &DataQuery) -> Result<Vec<PermanentRecord>, ConsentGateError> {
        let filter = query.validate()?;
        Ok(self.store.list_permanent(&filter)?)
    }

    /// Lists pending rows strictly older than `now - period` whose dialog has
    /// no decision, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentGateError::Storage`] on read failure.
    pub fn list_anomalies(
        &self,
        now: UtcTimestamp,
        period: Duration,
    ) -> Result<Vec<AnomalyRecord>, ConsentGateError> {
        Ok(self.store.list_anomalies(now.saturating_sub(period))?)
    }

    /// Lists anomalies as of the service clock using the configured period.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentGateError::Storage`] on read failure.
    pub fn list_current_anomalies(&self) -> Result<Vec<AnomalyRecord>, ConsentGateError> {
        self.list_anomalies(self.clock.now(), self.config.anomaly_period)
    }

    /// Returns the decision recorded for a dialog.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentGateError::Storage`] on read failure.
    pub fn consent_for(
        &self,
        dialog_id: &DialogId,
    ) -> Result<Option<ConsentDecision>, ConsentGateError> {
        Ok(self.store.consent_for(dialog_id)?)
    }

    /// Returns the rows still pending for a dialog.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentGateError::Storage`] on read failure.
    pub fn pending_for(&self, dialog_id: &DialogId) -> Result<Vec<PendingRecord>, ConsentGateError> {
        Ok(self.store.pending_for(dialog_id)?)
    }

    /// Checks that the backing store can serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentGateError::Storage`] when the store is unavailable.
    pub fn readiness(&self) -> Result<(), ConsentGateError> {
        Ok(self.store.readiness()?)
    }
}
