// crates/consent-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and the anomaly command.
// Purpose: Ensure the command surface parses and reports anomalies as JSON.
// Dependencies: consent-gate-cli main helpers
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use clap::CommandFactory;
use clap::Parser;
use consent_gate_config::ConsentGateConfig;
use consent_gate_config::StoreConfig;
use consent_gate_config::StoreType;
use consent_gate_core::DialogId;
use consent_gate_core::DialogSubmission;
use serde_json::Value;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::build_service;
use super::list_anomalies;
use super::render_anomalies;

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parses_serve_with_config_path() {
    let cli =
        Cli::try_parse_from(["consent-gate", "serve", "--config", "gate.toml"]).expect("parse");
    let Commands::Serve(command) = cli.command else {
        panic!("expected serve");
    };
    assert_eq!(command.config.as_deref(), Some(std::path::Path::new("gate.toml")));
}

#[test]
fn parses_config_validate_and_anomalies() {
    let cli = Cli::try_parse_from(["consent-gate", "config", "validate"]).expect("parse");
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Validate(_)
        }
    ));
    let cli =
        Cli::try_parse_from(["consent-gate", "anomalies", "--period-ms", "5000"]).expect("parse");
    let Commands::Anomalies(command) = cli.command else {
        panic!("expected anomalies");
    };
    assert_eq!(command.period_ms, Some(5000));
}

#[test]
fn rejects_zero_period_and_missing_subcommand() {
    assert!(Cli::try_parse_from(["consent-gate", "anomalies", "--period-ms", "0"]).is_err());
    assert!(Cli::try_parse_from(["consent-gate"]).is_err());
}

// ============================================================================
// SECTION: Anomalies
// ============================================================================

#[test]
fn memory_store_reports_no_anomalies() {
    let anomalies = list_anomalies(&ConsentGateConfig::default(), None).expect("anomalies");
    assert!(anomalies.is_empty());
    assert_eq!(render_anomalies(&anomalies).expect("render"), "[]");
}

#[test]
fn sqlite_store_reports_stale_pending_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = ConsentGateConfig::default();
    config.store = StoreConfig {
        store_type: StoreType::Sqlite,
        path: Some(dir.path().join("gate.db")),
        ..StoreConfig::default()
    };

    let service = build_service(&config).expect("service");
    let submission = DialogSubmission::new("c1", "d1", "hello", "en").expect("submission");
    service.submit_data(submission).expect("submit");
    let decided = DialogSubmission::new("c1", "d2", "bye", "en").expect("submission");
    service.submit_data(decided).expect("submit");
    service.record_consent(DialogId::new("d2"), false).expect("consent");
    drop(service);
    std::thread::sleep(Duration::from_millis(20));

    assert!(list_anomalies(&config, None).expect("default period").is_empty());
    let anomalies = list_anomalies(&config, Some(1)).expect("short period");
    assert_eq!(anomalies.len(), 1);
    let rendered: Value =
        serde_json::from_str(&render_anomalies(&anomalies).expect("render")).expect("json");
    assert_eq!(rendered[0]["dialog_id"], "d1");
    assert_eq!(rendered[0]["customer_id"], "c1");
}
