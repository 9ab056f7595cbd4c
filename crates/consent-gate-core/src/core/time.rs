// crates/consent-gate-core/src/core/time.rs
// ============================================================================
// Module: Consent Gate Time Model
// Description: UTC timestamps and injectable clocks.
// Purpose: Keep record timestamps at millisecond precision across stores.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Timestamps are stored as unix epoch milliseconds so that the in-memory and
//! `SQLite` stores agree exactly on ordering and equality. On the wire they
//! serialize as RFC 3339 strings in UTC. Reading wall-clock time goes through
//! [`Clock`] so that lifecycle logic can be driven deterministically in tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Nanoseconds per millisecond.
const NANOS_PER_MILLI: i128 = 1_000_000;

/// UTC instant with millisecond precision.
///
/// # Invariants
/// - The inner value is unix epoch milliseconds.
/// - Ordering follows chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtcTimestamp(i64);

impl UtcTimestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the current wall-clock time, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_offset_datetime(OffsetDateTime::now_utc())
    }

    /// Converts from a `time` datetime, truncating to milliseconds.
    #[must_use]
    pub fn from_offset_datetime(value: OffsetDateTime) -> Self {
        let millis = value.unix_timestamp_nanos() / NANOS_PER_MILLI;
        Self(i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX }))
    }

    /// Converts into a UTC `time` datetime.
    ///
    /// # Errors
    ///
    /// Returns [`time::error::ComponentRange`] when the value is outside the
    /// range representable by `time`.
    pub fn to_offset_datetime(self) -> Result<OffsetDateTime, time::error::ComponentRange> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * NANOS_PER_MILLI)
    }

    /// Returns this instant moved back by `period`, saturating at the minimum.
    #[must_use]
    pub fn saturating_sub(self, period: Duration) -> Self {
        let millis = i64::try_from(period.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(millis))
    }

    /// Formats the instant as an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns a message when the instant cannot be represented.
    pub fn to_rfc3339(self) -> Result<String, String> {
        let value = self.to_offset_datetime().map_err(|err| err.to_string())?;
        value.format(&Rfc3339).map_err(|err| err.to_string())
    }

    /// Parses an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns a message when the input is not valid RFC 3339.
    pub fn parse_rfc3339(value: &str) -> Result<Self, String> {
        OffsetDateTime::parse(value, &Rfc3339)
            .map(Self::from_offset_datetime)
            .map_err(|err| err.to_string())
    }
}

impl fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}ms", self.0),
        }
    }
}

impl Serialize for UtcTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_rfc3339().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for UtcTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse_rfc3339(&text).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Source of the current time for lifecycle operations.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> UtcTimestamp;
}

/// Wall-clock time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcTimestamp {
        UtcTimestamp::now()
    }
}

/// Manually advanced clock for tests and replay.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Current instant in unix milliseconds.
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: UtcTimestamp) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.as_unix_millis())),
        }
    }

    /// Moves the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        let millis = i64::try_from(step.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Sets the clock to an explicit instant.
    pub fn set(&self, value: UtcTimestamp) {
        self.millis.store(value.as_unix_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UtcTimestamp {
        UtcTimestamp::from_unix_millis(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
