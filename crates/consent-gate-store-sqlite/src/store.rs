// crates/consent-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Dialog Store
// Description: Durable DialogStore backed by SQLite WAL.
// Purpose: Persist staged, permanent, and consent rows with atomic transitions.
// Dependencies: consent-gate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`DialogStore`] using `SQLite`. Three
//! tables back the lifecycle: `temporary_dialog_data` (staging),
//! `dialog_data` (permanent), and `consents` (one row per dialog, enforced by
//! a UNIQUE constraint). Writes go through a single writer connection and use
//! `BEGIN IMMEDIATE`, so the consent check, the decision insert, and the
//! promote/delete step commit together or not at all. Reads use a pool of
//! query-only connections so they never wait on the writer under WAL.
//!
//! Timestamps are stored as unix epoch milliseconds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use consent_gate_core::AnomalyRecord;
use consent_gate_core::ConsentDecision;
use consent_gate_core::ConsentOutcome;
use consent_gate_core::ConsentRequest;
use consent_gate_core::CustomerId;
use consent_gate_core::DataFilter;
use consent_gate_core::DialogId;
use consent_gate_core::DialogStore;
use consent_gate_core::Language;
use consent_gate_core::NewPendingRecord;
use consent_gate_core::PendingRecord;
use consent_gate_core::PermanentRecord;
use consent_gate_core::RecordId;
use consent_gate_core::StoreError;
use consent_gate_core::UtcTimestamp;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
pub const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read-only connections.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Column list shared by the staging and permanent tables.
const RECORD_COLUMNS: &str =
    "id, customer_id, dialog_id, text, language, received_at_timestamp_utc";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` dialog store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of query-only connections used by read operations.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default tuning.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default read connection pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages never embed dialog text.
#[derive(Debug, Clone, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows fail integrity checks.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// No pending rows exist for the dialog.
    #[error("no pending data for dialog {0}")]
    NotFound(DialogId),
    /// A consent decision already exists for the dialog.
    #[error("consent already recorded for dialog {0}")]
    Conflict(DialogId),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(dialog_id) => Self::NotFound(dialog_id),
            SqliteStoreError::Conflict(dialog_id) => Self::Conflict(dialog_id),
        }
    }
}

/// Maps an engine error to a store error.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

/// Returns true when the engine rejected a write on a constraint.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation
    )
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed dialog store with WAL support.
///
/// # Invariants
/// - All writes go through `write_connection` inside immediate transactions.
/// - Read connections are query-only.
#[derive(Clone)]
pub struct SqliteDialogStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared writer connection guarded by a mutex.
    write_connection: Arc<Mutex<Connection>>,
    /// Query-only connection pool used for read path isolation under WAL.
    read_connections: Arc<Vec<Mutex<Connection>>>,
    /// Round-robin cursor for read connection selection.
    read_cursor: Arc<AtomicUsize>,
}

impl SqliteDialogStore {
    /// Opens an `SQLite`-backed dialog store, creating the schema if absent.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or when it carries an unknown schema version.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        if config.read_pool_size == 0 {
            return Err(SqliteStoreError::Invalid(
                "read_pool_size must be greater than zero".to_string(),
            ));
        }
        let mut write_connection = open_connection(&config)?;
        initialize_schema(&mut write_connection)?;
        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0 .. config.read_pool_size {
            let read_connection = open_connection(&config)?;
            read_connection.execute_batch("PRAGMA query_only = ON;").map_err(db_error)?;
            read_connections.push(Mutex::new(read_connection));
        }
        Ok(Self {
            config,
            write_connection: Arc::new(Mutex::new(write_connection)),
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the next read connection in round-robin order.
    fn read_connection(&self) -> &Mutex<Connection> {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        &self.read_connections[index]
    }

    /// Runs `op` against a read connection.
    fn with_reader<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .read_connection()
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite read mutex poisoned".to_string()))?;
        op(&guard)
    }

    /// Appends a pending row unless the dialog is already decided.
    fn insert_pending_row(
        &self,
        record: NewPendingRecord,
    ) -> Result<PendingRecord, SqliteStoreError> {
        let mut guard = self
            .write_connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite write mutex poisoned".to_string()))?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        if consent_exists(&tx, &record.dialog_id)? {
            return Err(SqliteStoreError::Conflict(record.dialog_id));
        }
        tx.execute(
            "INSERT INTO temporary_dialog_data (customer_id, dialog_id, text, language, \
             received_at_timestamp_utc) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.customer_id.as_str(),
                record.dialog_id.as_str(),
                record.text,
                record.language.as_str(),
                record.received_at.as_unix_millis()
            ],
        )
        .map_err(db_error)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(PendingRecord {
            id: RecordId::from_raw(id),
            customer_id: record.customer_id,
            dialog_id: record.dialog_id,
            text: record.text,
            language: record.language,
            received_at: record.received_at,
        })
    }

    /// Applies a consent decision in one immediate transaction.
    fn apply_consent(&self, request: ConsentRequest) -> Result<ConsentOutcome, SqliteStoreError> {
        let mut guard = self
            .write_connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite write mutex poisoned".to_string()))?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        let dialog = request.dialog_id.as_str();
        if consent_exists(&tx, &request.dialog_id)? {
            return Err(SqliteStoreError::Conflict(request.dialog_id));
        }
        let staged: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM temporary_dialog_data WHERE dialog_id = ?1",
                params![dialog],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        if staged == 0 {
            return Err(SqliteStoreError::NotFound(request.dialog_id));
        }

        let inserted = tx.execute(
            "INSERT INTO consents (dialog_id, has_given_consent, received_at_timestamp_utc) \
             VALUES (?1, ?2, ?3)",
            params![dialog, request.has_given_consent, request.received_at.as_unix_millis()],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_constraint_violation(&err) => {
                return Err(SqliteStoreError::Conflict(request.dialog_id));
            }
            Err(err) => return Err(db_error(err)),
        }
        let decision_id = tx.last_insert_rowid();

        let promoted = if request.has_given_consent {
            tx.execute(
                "INSERT INTO dialog_data (customer_id, dialog_id, text, language, \
                 received_at_timestamp_utc) SELECT customer_id, dialog_id, text, language, \
                 received_at_timestamp_utc FROM temporary_dialog_data WHERE dialog_id = ?1 ORDER \
                 BY id",
                params![dialog],
            )
            .map_err(db_error)?
        } else {
            0
        };
        let cleared = tx
            .execute("DELETE FROM temporary_dialog_data WHERE dialog_id = ?1", params![dialog])
            .map_err(db_error)?;
        if request.has_given_consent && promoted != cleared {
            return Err(SqliteStoreError::Corrupt(format!(
                "promoted {promoted} rows but cleared {cleared} for dialog {dialog}"
            )));
        }
        tx.commit().map_err(db_error)?;
        drop(guard);

        Ok(ConsentOutcome {
            decision: ConsentDecision {
                id: RecordId::from_raw(decision_id),
                dialog_id: request.dialog_id,
                has_given_consent: request.has_given_consent,
                received_at: request.received_at,
            },
            promoted,
            cleared,
        })
    }

    /// Lists permanent rows in canonical order with pagination.
    fn select_permanent(
        &self,
        filter: &DataFilter,
    ) -> Result<Vec<PermanentRecord>, SqliteStoreError> {
        let limit = match filter.limit {
            None => -1,
            Some(value) => i64::try_from(value)
                .map_err(|_| SqliteStoreError::Invalid("limit out of range".to_string()))?,
        };
        let offset = i64::try_from(filter.skip)
            .map_err(|_| SqliteStoreError::Invalid("skip out of range".to_string()))?;
        let language = filter.language.as_ref().map(Language::as_str);
        let customer = filter.customer_id.as_ref().map(CustomerId::as_str);
        self.with_reader(|connection| {
            let mut statement = connection
                .prepare_cached(&format!(
                    "SELECT {RECORD_COLUMNS} FROM dialog_data WHERE (?1 IS NULL OR language = ?1) \
                     AND (?2 IS NULL OR customer_id = ?2) ORDER BY received_at_timestamp_utc \
                     DESC, id DESC LIMIT ?3 OFFSET ?4"
                ))
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![language, customer, limit, offset], read_record_row)
                .map_err(db_error)?;
            let mut records = Vec::new();
            for row in rows {
                let stored = row.map_err(db_error)?;
                records.push(stored.into_permanent()?);
            }
            Ok(records)
        })
    }

    /// Lists undecided staging rows received before `cutoff`.
    fn select_anomalies(
        &self,
        cutoff: UtcTimestamp,
    ) -> Result<Vec<AnomalyRecord>, SqliteStoreError> {
        self.with_reader(|connection| {
            let mut statement = connection
                .prepare_cached(
                    "SELECT t.dialog_id, t.customer_id, t.received_at_timestamp_utc FROM \
                     temporary_dialog_data t WHERE t.received_at_timestamp_utc < ?1 AND NOT \
                     EXISTS (SELECT 1 FROM consents c WHERE c.dialog_id = t.dialog_id) ORDER BY \
                     t.received_at_timestamp_utc ASC, t.id ASC",
                )
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![cutoff.as_unix_millis()], |row| {
                    let dialog_id: String = row.get(0)?;
                    let customer_id: String = row.get(1)?;
                    let received_at: i64 = row.get(2)?;
                    Ok(AnomalyRecord {
                        dialog_id: DialogId::new(dialog_id),
                        customer_id: CustomerId::new(customer_id),
                        received_at: UtcTimestamp::from_unix_millis(received_at),
                    })
                })
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Lists staging rows for one dialog in id order.
    fn select_pending(&self, dialog_id: &DialogId) -> Result<Vec<PendingRecord>, SqliteStoreError> {
        self.with_reader(|connection| {
            let mut statement = connection
                .prepare_cached(&format!(
                    "SELECT {RECORD_COLUMNS} FROM temporary_dialog_data WHERE dialog_id = ?1 \
                     ORDER BY id"
                ))
                .map_err(db_error)?;
            let rows =
                statement.query_map(params![dialog_id.as_str()], read_record_row).map_err(db_error)?;
            let mut records = Vec::new();
            for row in rows {
                let stored = row.map_err(db_error)?;
                records.push(stored.into_pending()?);
            }
            Ok(records)
        })
    }

    /// Loads the consent decision for one dialog.
    fn select_consent(
        &self,
        dialog_id: &DialogId,
    ) -> Result<Option<ConsentDecision>, SqliteStoreError> {
        self.with_reader(|connection| {
            connection
                .query_row(
                    "SELECT id, has_given_consent, received_at_timestamp_utc FROM consents WHERE \
                     dialog_id = ?1",
                    params![dialog_id.as_str()],
                    |row| {
                        let id: i64 = row.get(0)?;
                        let has_given_consent: bool = row.get(1)?;
                        let received_at: i64 = row.get(2)?;
                        Ok(ConsentDecision {
                            id: RecordId::from_raw(id),
                            dialog_id: dialog_id.clone(),
                            has_given_consent,
                            received_at: UtcTimestamp::from_unix_millis(received_at),
                        })
                    },
                )
                .optional()
                .map_err(db_error)
        })
    }

    /// Verifies both the read path and the writer can execute statements.
    fn check_connection(&self) -> Result<(), SqliteStoreError> {
        self.with_reader(|connection| {
            connection.query_row("SELECT 1", [], |_| Ok(())).map_err(db_error)
        })?;
        let guard = self
            .write_connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite write mutex poisoned".to_string()))?;
        guard.query_row("SELECT 1", [], |_| Ok(())).map_err(db_error)
    }
}

impl DialogStore for SqliteDialogStore {
    fn insert_pending(&self, record: NewPendingRecord) -> Result<PendingRecord, StoreError> {
        self.insert_pending_row(record).map_err(StoreError::from)
    }

    fn record_consent(&self, request: ConsentRequest) -> Result<ConsentOutcome, StoreError> {
        self.apply_consent(request).map_err(StoreError::from)
    }

    fn list_permanent(&self, filter: &DataFilter) -> Result<Vec<PermanentRecord>, StoreError> {
        self.select_permanent(filter).map_err(StoreError::from)
    }

    fn list_anomalies(&self, cutoff: UtcTimestamp) -> Result<Vec<AnomalyRecord>, StoreError> {
        self.select_anomalies(cutoff).map_err(StoreError::from)
    }

    fn pending_for(&self, dialog_id: &DialogId) -> Result<Vec<PendingRecord>, StoreError> {
        self.select_pending(dialog_id).map_err(StoreError::from)
    }

    fn consent_for(&self, dialog_id: &DialogId) -> Result<Option<ConsentDecision>, StoreError> {
        self.select_consent(dialog_id).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.check_connection().map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Raw row shared by the staging and permanent tables.
struct StoredRecord {
    /// Row identifier.
    id: i64,
    /// Customer identifier.
    customer_id: String,
    /// Dialog identifier.
    dialog_id: String,
    /// Dialog text.
    text: String,
    /// Stored language tag.
    language: String,
    /// Receipt time in unix millis.
    received_at: i64,
}

impl StoredRecord {
    /// Re-validates the stored language tag.
    fn language(&self) -> Result<Language, SqliteStoreError> {
        Language::parse(&self.language).map_err(|_| {
            SqliteStoreError::Corrupt(format!("row {} has an empty language", self.id))
        })
    }

    /// Converts into a permanent record.
    fn into_permanent(self) -> Result<PermanentRecord, SqliteStoreError> {
        let language = self.language()?;
        Ok(PermanentRecord {
            id: RecordId::from_raw(self.id),
            customer_id: CustomerId::new(self.customer_id),
            dialog_id: DialogId::new(self.dialog_id),
            text: self.text,
            language,
            received_at: UtcTimestamp::from_unix_millis(self.received_at),
        })
    }

    /// Converts into a pending record.
    fn into_pending(self) -> Result<PendingRecord, SqliteStoreError> {
        let language = self.language()?;
        Ok(PendingRecord {
            id: RecordId::from_raw(self.id),
            customer_id: CustomerId::new(self.customer_id),
            dialog_id: DialogId::new(self.dialog_id),
            text: self.text,
            language,
            received_at: UtcTimestamp::from_unix_millis(self.received_at),
        })
    }
}

/// Reads a [`StoredRecord`] from a row selected with [`RECORD_COLUMNS`].
fn read_record_row(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    Ok(StoredRecord {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        dialog_id: row.get(2)?,
        text: row.get(3)?,
        language: row.get(4)?,
        received_at: row.get(5)?,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when a decision exists for `dialog_id`.
fn consent_exists(connection: &Connection, dialog_id: &DialogId) -> Result<bool, SqliteStoreError> {
    connection
        .query_row(
            "SELECT 1 FROM consents WHERE dialog_id = ?1",
            params![dialog_id.as_str()],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(db_error)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS temporary_dialog_data (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    customer_id TEXT NOT NULL,
                    dialog_id TEXT NOT NULL,
                    text TEXT NOT NULL,
                    language TEXT NOT NULL,
                    received_at_timestamp_utc INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_temporary_dialog_data_dialog_id
                    ON temporary_dialog_data (dialog_id);
                CREATE INDEX IF NOT EXISTS idx_temporary_dialog_data_received_at
                    ON temporary_dialog_data (received_at_timestamp_utc);
                CREATE TABLE IF NOT EXISTS dialog_data (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    customer_id TEXT NOT NULL,
                    dialog_id TEXT NOT NULL,
                    text TEXT NOT NULL,
                    language TEXT NOT NULL,
                    received_at_timestamp_utc INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_dialog_data_order
                    ON dialog_data (received_at_timestamp_utc DESC, id DESC);
                CREATE INDEX IF NOT EXISTS idx_dialog_data_customer_id
                    ON dialog_data (customer_id);
                CREATE INDEX IF NOT EXISTS idx_dialog_data_language
                    ON dialog_data (language);
                CREATE TABLE IF NOT EXISTS consents (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    dialog_id TEXT NOT NULL UNIQUE,
                    has_given_consent INTEGER NOT NULL,
                    received_at_timestamp_utc INTEGER NOT NULL
                );",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}
