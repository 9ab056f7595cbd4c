// crates/consent-gate-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite DialogStore behavior.
// Purpose: Ensure durable persistence, atomic consent transitions, and
//          schema handling.
// Dependencies: consent-gate-store-sqlite, consent-gate-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed dialog store. Exercises the
//! lifecycle through the shared service, concurrent consent attempts from
//! threads and from independent store instances, reopen durability, and
//! schema version checks.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use consent_gate_core::ConsentGate;
use consent_gate_core::ConsentGateError;
use consent_gate_core::DataQuery;
use consent_gate_core::DialogId;
use consent_gate_core::DialogStore;
use consent_gate_core::DialogSubmission;
use consent_gate_core::LifecycleConfig;
use consent_gate_core::ManualClock;
use consent_gate_core::StoreError;
use consent_gate_core::UtcTimestamp;
use consent_gate_store_sqlite::SqliteDialogStore;
use consent_gate_store_sqlite::SqliteStoreConfig;
use consent_gate_store_sqlite::SqliteStoreError;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const START_MS: i64 = 1_700_000_000_000;

fn open_store(path: &Path) -> SqliteDialogStore {
    SqliteDialogStore::new(SqliteStoreConfig::for_path(path)).expect("store init")
}

fn service(path: &Path) -> (ConsentGate<SqliteDialogStore>, ManualClock) {
    let clock = ManualClock::new(UtcTimestamp::from_unix_millis(START_MS));
    let config = LifecycleConfig {
        anomaly_period: Duration::from_secs(60),
    };
    let gate = ConsentGate::with_clock(open_store(path), config, Arc::new(clock.clone()));
    (gate, clock)
}

fn submit(gate: &ConsentGate<SqliteDialogStore>, customer: &str, dialog: &str, text: &str) {
    let submission = DialogSubmission::new(customer, dialog, text, "EN").expect("submission");
    gate.submit_data(submission).expect("submit");
}

fn count_rows(path: &Path, table: &str) -> i64 {
    let connection = rusqlite::Connection::open(path).unwrap();
    connection.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0)).unwrap()
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn sqlite_store_promotes_on_consent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let (gate, clock) = service(&path);
    for text in ["one", "two", "three"] {
        submit(&gate, "c1", "d1", text);
        clock.advance(Duration::from_millis(5));
    }

    let outcome = gate.record_consent(DialogId::new("d1"), true).unwrap();
    assert_eq!(outcome.promoted, 3);
    assert_eq!(outcome.cleared, 3);

    let rows = gate.list_data(&DataQuery::default()).unwrap();
    let texts: Vec<&str> = rows.iter().map(|row| row.text.as_str()).collect();
    assert_eq!(texts, vec!["three", "two", "one"]);
    assert!(rows.iter().all(|row| row.language.as_str() == "en"));
    assert_eq!(rows[2].received_at.as_unix_millis(), START_MS);
    assert_eq!(count_rows(&path, "temporary_dialog_data"), 0);
    assert_eq!(count_rows(&path, "dialog_data"), 3);
    assert_eq!(count_rows(&path, "consents"), 1);
}

#[test]
fn sqlite_store_discards_on_refusal() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let (gate, _clock) = service(&path);
    submit(&gate, "c1", "d2", "private");
    let outcome = gate.record_consent(DialogId::new("d2"), false).unwrap();
    assert_eq!(outcome.promoted, 0);
    assert_eq!(outcome.cleared, 1);
    assert!(gate.list_data(&DataQuery::default()).unwrap().is_empty());
    assert_eq!(count_rows(&path, "temporary_dialog_data"), 0);
    let decision = gate.consent_for(&DialogId::new("d2")).unwrap().expect("decision");
    assert!(!decision.has_given_consent);
}

#[test]
fn sqlite_store_rejects_duplicate_and_missing_consent() {
    let temp = TempDir::new().unwrap();
    let (gate, _clock) = service(&temp.path().join("store.sqlite"));
    assert_eq!(
        gate.record_consent(DialogId::new("ghost"), true).unwrap_err(),
        ConsentGateError::NotFound(DialogId::new("ghost"))
    );
    submit(&gate, "c1", "d1", "text");
    gate.record_consent(DialogId::new("d1"), false).unwrap();
    assert_eq!(
        gate.record_consent(DialogId::new("d1"), true).unwrap_err(),
        ConsentGateError::Conflict(DialogId::new("d1"))
    );
}

#[test]
fn sqlite_store_rejects_intake_after_decision() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let (gate, _clock) = service(&path);
    submit(&gate, "c1", "d1", "text");
    gate.record_consent(DialogId::new("d1"), true).unwrap();
    let late = DialogSubmission::new("c1", "d1", "late", "en").unwrap();
    assert_eq!(
        gate.submit_data(late).unwrap_err(),
        ConsentGateError::Conflict(DialogId::new("d1"))
    );
    assert_eq!(count_rows(&path, "temporary_dialog_data"), 0);
}

#[test]
fn sqlite_store_filters_and_paginates() {
    let temp = TempDir::new().unwrap();
    let (gate, clock) = service(&temp.path().join("store.sqlite"));
    for (index, language) in ["fr", "FR", "en", "Fr", "de"].iter().enumerate() {
        let customer = if index % 2 == 0 { "alice" } else { "bob" };
        let submission =
            DialogSubmission::new(customer, "d1", format!("row-{index}"), language).unwrap();
        gate.submit_data(submission).unwrap();
        clock.advance(Duration::from_millis(10));
    }
    gate.record_consent(DialogId::new("d1"), true).unwrap();

    for casing in ["fr", "FR", "Fr", "fR"] {
        let rows = gate
            .list_data(&DataQuery {
                language: Some(casing.to_string()),
                ..DataQuery::default()
            })
            .unwrap();
        let texts: Vec<&str> = rows.iter().map(|row| row.text.as_str()).collect();
        assert_eq!(texts, vec!["row-3", "row-1", "row-0"], "casing {casing}");
    }

    let alice = gate
        .list_data(&DataQuery {
            customer_id: Some("alice".to_string()),
            ..DataQuery::default()
        })
        .unwrap();
    assert_eq!(alice.len(), 3);

    let page = gate
        .list_data(&DataQuery {
            skip: Some(1),
            limit: Some(2),
            ..DataQuery::default()
        })
        .unwrap();
    let texts: Vec<&str> = page.iter().map(|row| row.text.as_str()).collect();
    assert_eq!(texts, vec!["row-3", "row-2"]);

    let past_end = gate
        .list_data(&DataQuery {
            skip: Some(10),
            ..DataQuery::default()
        })
        .unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn sqlite_store_reports_anomalies_oldest_first() {
    let temp = TempDir::new().unwrap();
    let (gate, clock) = service(&temp.path().join("store.sqlite"));
    submit(&gate, "c1", "old", "a");
    clock.advance(Duration::from_secs(1));
    submit(&gate, "c2", "newer", "b");
    submit(&gate, "c3", "decided", "c");
    gate.record_consent(DialogId::new("decided"), true).unwrap();

    assert!(gate.list_current_anomalies().unwrap().is_empty());
    clock.advance(Duration::from_secs(120));
    let dialogs: Vec<String> = gate
        .list_current_anomalies()
        .unwrap()
        .into_iter()
        .map(|row| row.dialog_id.to_string())
        .collect();
    assert_eq!(dialogs, vec!["old".to_string(), "newer".to_string()]);

    let exact = UtcTimestamp::from_unix_millis(START_MS + 60_000);
    assert!(gate.list_anomalies(exact, Duration::from_secs(60)).unwrap().is_empty());
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn sqlite_store_concurrent_consents_yield_one_winner() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = open_store(&path);
    let gate = ConsentGate::new(store, LifecycleConfig::default());
    for text in ["a", "b"] {
        gate.submit_data(DialogSubmission::new("c1", "race", text, "en").unwrap()).unwrap();
    }

    let gate = Arc::new(gate);
    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for index in 0 .. 8 {
        let gate = Arc::clone(&gate);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            gate.record_consent(DialogId::new("race"), index % 2 == 0)
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    let winners = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(ConsentGateError::Conflict(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(count_rows(&path, "consents"), 1);
    assert_eq!(count_rows(&path, "temporary_dialog_data"), 0);
}

#[test]
fn sqlite_store_independent_instances_share_the_guard() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let first = open_store(&path);
    let second = open_store(&path);
    let gate_a = ConsentGate::new(first, LifecycleConfig::default());
    let gate_b = ConsentGate::new(second, LifecycleConfig::default());
    gate_a.submit_data(DialogSubmission::new("c1", "shared", "text", "en").unwrap()).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let barrier_a = Arc::clone(&barrier);
    let handle_a = thread::spawn(move || {
        barrier_a.wait();
        gate_a.record_consent(DialogId::new("shared"), true)
    });
    let handle_b = thread::spawn(move || {
        barrier.wait();
        gate_b.record_consent(DialogId::new("shared"), false)
    });
    let outcomes = [handle_a.join().unwrap(), handle_b.join().unwrap()];
    assert_eq!(outcomes.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(
        outcomes.iter().any(|result| matches!(result, Err(ConsentGateError::Conflict(_))))
    );
    assert_eq!(count_rows(&path, "consents"), 1);
}

#[test]
fn sqlite_store_constraint_rejects_second_decision_row() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let _store = open_store(&path);
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection
        .execute(
            "INSERT INTO consents (dialog_id, has_given_consent, received_at_timestamp_utc) \
             VALUES ('d1', 1, 0)",
            [],
        )
        .unwrap();
    let err = connection
        .execute(
            "INSERT INTO consents (dialog_id, has_given_consent, received_at_timestamp_utc) \
             VALUES ('d1', 0, 0)",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("UNIQUE"));
}

// ============================================================================
// SECTION: Durability And Schema
// ============================================================================

#[test]
fn sqlite_store_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    {
        let (gate, _clock) = service(&path);
        submit(&gate, "c1", "d1", "persisted");
        submit(&gate, "c1", "d9", "still pending");
        gate.record_consent(DialogId::new("d1"), true).unwrap();
    }
    let store = open_store(&path);
    let rows = store.list_permanent(&DataQuery::default().validate().unwrap()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text, "persisted");
    assert_eq!(store.pending_for(&DialogId::new("d9")).unwrap().len(), 1);
    assert!(store.consent_for(&DialogId::new("d1")).unwrap().is_some());
    store.readiness().unwrap();
}

#[test]
fn sqlite_store_pending_ids_are_monotonic() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let (gate, _clock) = service(&path);
    let first = gate.submit_data(DialogSubmission::new("c", "d", "a", "en").unwrap()).unwrap();
    gate.record_consent(DialogId::new("d"), false).unwrap();
    let second = gate.submit_data(DialogSubmission::new("c", "e", "b", "en").unwrap()).unwrap();
    assert!(second.id > first.id);
}

#[test]
fn sqlite_store_rejects_unknown_schema_version() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    drop(open_store(&path));
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(connection);
    let err = SqliteDialogStore::new(SqliteStoreConfig::for_path(&path)).err().expect("error");
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
    let converted: StoreError = err.into();
    assert!(matches!(converted, StoreError::VersionMismatch(_)));
}

#[test]
fn sqlite_store_rejects_directory_path() {
    let temp = TempDir::new().unwrap();
    let err = SqliteDialogStore::new(SqliteStoreConfig::for_path(temp.path())).err().expect("error");
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn sqlite_store_rejects_empty_read_pool() {
    let temp = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::for_path(temp.path().join("store.sqlite"));
    config.read_pool_size = 0;
    let err = SqliteDialogStore::new(config).err().expect("error");
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}
