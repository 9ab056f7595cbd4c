// crates/consent-gate-core/src/core/query.rs
// ============================================================================
// Module: Consent Gate Data Queries
// Description: Read-side filters, ordering, and pagination for permanent data.
// Purpose: Validate list requests once so every store applies them identically.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! [`DataQuery`] is the raw, caller-supplied request; [`DataFilter`] is the
//! validated form handed to stores. Validation happens before any storage
//! access: a negative `skip` or a non-positive `limit` is rejected rather than
//! clamped. Empty filter strings mean "no filter".
//!
//! Ordering is `received_at` descending with the permanent row id descending
//! as the tie-breaker; pagination is applied strictly after ordering.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use crate::core::identifiers::CustomerId;
use crate::core::records::Language;
use crate::core::records::PermanentRecord;
use crate::core::validation::ValidationError;

// ============================================================================
// SECTION: Query Types
// ============================================================================

/// Raw list request for permanent records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataQuery {
    /// Optional language filter (any casing).
    pub language: Option<String>,
    /// Optional exact customer filter.
    pub customer_id: Option<String>,
    /// Optional number of leading rows to drop.
    pub skip: Option<i64>,
    /// Optional maximum number of rows to return.
    pub limit: Option<i64>,
}

impl DataQuery {
    /// Validates the request into a store filter.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeSkip`] for `skip < 0` and
    /// [`ValidationError::NonPositiveLimit`] for `limit <= 0`.
    pub fn validate(&self) -> Result<DataFilter, ValidationError> {
        let skip = match self.skip {
            None => 0,
            Some(value) => u64::try_from(value).map_err(|_| ValidationError::NegativeSkip(value))?,
        };
        let limit = match self.limit {
            None => None,
            Some(value) if value <= 0 => return Err(ValidationError::NonPositiveLimit(value)),
            Some(value) => {
                Some(u64::try_from(value).map_err(|_| ValidationError::NonPositiveLimit(value))?)
            }
        };
        let language = match self.language.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(Language::parse(raw)?),
        };
        let customer_id =
            self.customer_id.as_deref().filter(|value| !value.is_empty()).map(CustomerId::from);
        Ok(DataFilter {
            language,
            customer_id,
            skip,
            limit,
        })
    }
}

/// Validated list filter.
///
/// # Invariants
/// - `limit`, when set, is greater than zero.
/// - `language`, when set, is lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFilter {
    /// Language equality filter.
    pub language: Option<Language>,
    /// Customer equality filter.
    pub customer_id: Option<CustomerId>,
    /// Leading rows to drop after ordering.
    pub skip: u64,
    /// Maximum rows to return after skipping.
    pub limit: Option<u64>,
}

impl DataFilter {
    /// Returns true when `record` passes the equality filters.
    #[must_use]
    pub fn matches(&self, record: &PermanentRecord) -> bool {
        self.language.as_ref().is_none_or(|language| record.language == *language)
            && self.customer_id.as_ref().is_none_or(|customer| record.customer_id == *customer)
    }

    /// Applies `skip` then `limit` to an already ordered sequence.
    #[must_use]
    pub fn paginate<T>(&self, ordered: Vec<T>) -> Vec<T> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self.limit.map_or(usize::MAX, |value| usize::try_from(value).unwrap_or(usize::MAX));
        ordered.into_iter().skip(skip).take(limit).collect()
    }
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

/// Canonical listing order: newest first, then highest id first.
#[must_use]
pub fn newest_first(a: &PermanentRecord, b: &PermanentRecord) -> Ordering {
    b.received_at.cmp(&a.received_at).then_with(|| b.id.cmp(&a.id))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
