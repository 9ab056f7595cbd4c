// crates/consent-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Consent Gate Identifiers
// Description: Opaque identifiers for customers, dialogs, and stored rows.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Customer and dialog identifiers arrive as URL path segments and are kept
//! verbatim; matching on them is exact. Row identifiers are assigned by the
//! store and are only unique within their own table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Customer identifier attached to every dialog record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    /// Creates a new customer identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CustomerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CustomerId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Dialog identifier; the unit a consent decision applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogId(String);

impl DialogId {
    /// Creates a new dialog identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DialogId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DialogId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Store-assigned row identifier.
///
/// # Invariants
/// - Values are positive and strictly increasing within one table.
/// - Pending and permanent ids are unrelated sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Wraps a raw row identifier.
    #[must_use]
    pub const fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw row identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
