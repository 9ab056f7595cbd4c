// crates/consent-gate-core/src/core/records.rs
// ============================================================================
// Module: Consent Gate Records
// Description: Pending, permanent, consent, and anomaly record types.
// Purpose: Canonical serializable shapes for every stage of the data lifecycle.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A dialog's text lives as [`PendingRecord`] rows until a single
//! [`ConsentDecision`] either promotes them to [`PermanentRecord`] rows or
//! discards them. Pending and permanent rows share a shape but are distinct
//! types so that nothing can hand a caller-built value to the permanent table.
//!
//! Language codes are normalized to lowercase by [`Language`] at construction,
//! which makes every write site and every filter site agree on casing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CustomerId;
use crate::core::identifiers::DialogId;
use crate::core::identifiers::RecordId;
use crate::core::time::UtcTimestamp;
use crate::core::validation::ValidationError;

// ============================================================================
// SECTION: Language
// ============================================================================

/// Lowercased language tag.
///
/// # Invariants
/// - The inner value is lowercase and not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    /// Normalizes a raw language tag.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] when the tag is blank.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyField("language"));
        }
        Ok(Self(raw.to_lowercase()))
    }

    /// Returns the normalized tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Intake
// ============================================================================

/// Validated dialog text submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSubmission {
    /// Customer the dialog belongs to.
    pub customer_id: CustomerId,
    /// Dialog the text belongs to.
    pub dialog_id: DialogId,
    /// Conversational text.
    pub text: String,
    /// Normalized language tag.
    pub language: Language,
}

impl DialogSubmission {
    /// Validates and normalizes a raw submission.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when an identifier, the text, or the
    /// language is empty.
    pub fn new(
        customer_id: impl Into<String>,
        dialog_id: impl Into<String>,
        text: impl Into<String>,
        language: &str,
    ) -> Result<Self, ValidationError> {
        let customer_id = customer_id.into();
        if customer_id.is_empty() {
            return Err(ValidationError::EmptyField("customer_id"));
        }
        let dialog_id = dialog_id.into();
        if dialog_id.is_empty() {
            return Err(ValidationError::EmptyField("dialog_id"));
        }
        let text = text.into();
        if text.is_empty() {
            return Err(ValidationError::EmptyField("text"));
        }
        Ok(Self {
            customer_id: CustomerId::new(customer_id),
            dialog_id: DialogId::new(dialog_id),
            text,
            language: Language::parse(language)?,
        })
    }
}

/// Pending row ready to be appended to staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPendingRecord {
    /// Customer identifier.
    pub customer_id: CustomerId,
    /// Dialog identifier.
    pub dialog_id: DialogId,
    /// Conversational text.
    pub text: String,
    /// Normalized language tag.
    pub language: Language,
    /// Receipt time.
    pub received_at: UtcTimestamp,
}

impl NewPendingRecord {
    /// Stamps a validated submission with its receipt time.
    #[must_use]
    pub fn from_submission(submission: DialogSubmission, received_at: UtcTimestamp) -> Self {
        Self {
            customer_id: submission.customer_id,
            dialog_id: submission.dialog_id,
            text: submission.text,
            language: submission.language,
            received_at,
        }
    }
}

// ============================================================================
// SECTION: Stored Records
// ============================================================================

/// Staged dialog text awaiting a consent decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    /// Staging row identifier.
    pub id: RecordId,
    /// Customer identifier.
    pub customer_id: CustomerId,
    /// Dialog identifier.
    pub dialog_id: DialogId,
    /// Conversational text.
    pub text: String,
    /// Normalized language tag.
    pub language: Language,
    /// Receipt time.
    #[serde(rename = "received_at_timestamp_utc")]
    pub received_at: UtcTimestamp,
}

/// Dialog text retained after an affirmative consent decision.
///
/// # Invariants
/// - `received_at` is the original intake time of the pending row it was
///   promoted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermanentRecord {
    /// Permanent row identifier.
    pub id: RecordId,
    /// Customer identifier.
    pub customer_id: CustomerId,
    /// Dialog identifier.
    pub dialog_id: DialogId,
    /// Conversational text.
    pub text: String,
    /// Normalized language tag.
    pub language: Language,
    /// Original receipt time.
    #[serde(rename = "received_at_timestamp_utc")]
    pub received_at: UtcTimestamp,
}

/// One-time consent decision for a dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentDecision {
    /// Decision row identifier.
    pub id: RecordId,
    /// Dialog the decision applies to.
    pub dialog_id: DialogId,
    /// Whether the dialog's data may be retained.
    pub has_given_consent: bool,
    /// Decision time.
    #[serde(rename = "received_at_timestamp_utc")]
    pub received_at: UtcTimestamp,
}

/// Consent decision ready to be applied by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    /// Dialog the decision applies to.
    pub dialog_id: DialogId,
    /// Whether the dialog's data may be retained.
    pub has_given_consent: bool,
    /// Decision time.
    pub received_at: UtcTimestamp,
}

/// Pending row that outlived the anomaly period without a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Dialog identifier.
    pub dialog_id: DialogId,
    /// Customer identifier.
    pub customer_id: CustomerId,
    /// Receipt time of the stale pending row.
    #[serde(rename = "received_at_timestamp_utc")]
    pub received_at: UtcTimestamp,
}

/// Outcome of a consent transition, for callers that need counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentOutcome {
    /// Stored decision.
    pub decision: ConsentDecision,
    /// Number of pending rows copied to permanent storage.
    pub promoted: usize,
    /// Number of pending rows removed from staging.
    pub cleared: usize,
}
