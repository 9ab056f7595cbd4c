// crates/consent-gate-core/src/core/validation.rs
// ============================================================================
// Module: Consent Gate Validation Errors
// Description: Input validation failures raised before storage is touched.
// Purpose: Give every boundary a single, typed rejection vocabulary.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Input validation failure.
///
/// # Invariants
/// - Raised before any storage access; never retried.
/// - Messages name the offending field but never echo dialog text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent.
    #[error("field `{0}` is required")]
    MissingField(&'static str),
    /// A required field was present but empty.
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
    /// Pagination offset below zero.
    #[error("skip must be greater than or equal to zero (got {0})")]
    NegativeSkip(i64),
    /// Pagination limit of zero or below.
    #[error("limit must be greater than zero (got {0})")]
    NonPositiveLimit(i64),
    /// A numeric field could not be parsed.
    #[error("field `{field}` must be an integer")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
    },
    /// The request body could not be decoded.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
