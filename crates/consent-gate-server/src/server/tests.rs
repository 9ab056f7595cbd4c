// crates/consent-gate-server/src/server/tests.rs
// ============================================================================
// Module: Consent Gate Server Unit Tests
// Description: Unit tests for request decoding and error mapping.
// Purpose: Validate handler helpers without binding a socket.
// Dependencies: consent-gate-server
// ============================================================================

//! ## Overview
//! Exercises body decoding, query parsing, error-to-status mapping and CORS
//! construction with in-memory fixtures.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::StatusCode;
use consent_gate_core::ConsentGateError;
use consent_gate_core::DialogId;
use consent_gate_core::StoreError;
use consent_gate_core::ValidationError;

use super::ApiError;
use super::ListParams;
use super::build_cors_layer;
use super::parse_consent_body;
use super::parse_intake_body;

// ============================================================================
// SECTION: Body Decoding
// ============================================================================

#[test]
fn consent_body_accepts_object_and_bare_boolean() {
    assert!(parse_consent_body(br#"{"has_given_consent": true}"#).expect("object"));
    assert!(!parse_consent_body(br#"{"has_given_consent": false}"#).expect("object"));
    assert!(parse_consent_body(b"true").expect("bare"));
    assert!(!parse_consent_body(b" false ").expect("bare"));
}

#[test]
fn consent_body_rejects_non_boolean_payloads() {
    let bodies: [&[u8]; 5] =
        [b"\"yes\"", b"{}", b"{\"has_given_consent\": \"true\"}", b"", b"1"];
    for raw in bodies {
        assert!(matches!(parse_consent_body(raw), Err(ValidationError::InvalidPayload(_))));
    }
}

#[test]
fn intake_body_requires_text_and_language() {
    let body = parse_intake_body(br#"{"text": "hello", "language": "EN"}"#).expect("valid");
    assert_eq!(body.text, "hello");
    assert_eq!(body.language, "EN");
    assert!(parse_intake_body(br#"{"language": "en"}"#).is_err());
    assert!(parse_intake_body(br#"{"text": "hello"}"#).is_err());
    assert!(parse_intake_body(b"not json").is_err());
}

// ============================================================================
// SECTION: Query Parsing
// ============================================================================

#[test]
fn list_params_parse_integers_and_treat_blank_as_absent() {
    let query = ListParams {
        language: Some("fr".to_string()),
        customer_id: None,
        skip: Some("2".to_string()),
        limit: Some(String::new()),
    }
    .into_query()
    .expect("query");
    assert_eq!(query.skip, Some(2));
    assert_eq!(query.limit, None);
    assert_eq!(query.language.as_deref(), Some("fr"));
}

#[test]
fn list_params_reject_non_integer_values() {
    let err = ListParams {
        skip: Some("abc".to_string()),
        ..ListParams::default()
    }
    .into_query()
    .expect_err("non-integer");
    assert_eq!(
        err,
        ValidationError::InvalidNumber {
            field: "skip"
        }
    );
    let err = ListParams {
        limit: Some("1.5".to_string()),
        ..ListParams::default()
    }
    .into_query()
    .expect_err("non-integer");
    assert_eq!(
        err,
        ValidationError::InvalidNumber {
            field: "limit"
        }
    );
}

#[test]
fn negative_values_pass_through_to_lifecycle_validation() {
    let query = ListParams {
        skip: Some("-1".to_string()),
        limit: Some("0".to_string()),
        ..ListParams::default()
    }
    .into_query()
    .expect("parsed");
    assert_eq!(query.skip, Some(-1));
    assert_eq!(query.limit, Some(0));
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

#[test]
fn lifecycle_errors_map_to_statuses() {
    let dialog = DialogId::new("d1");
    let cases = [
        (
            ConsentGateError::Validation(ValidationError::NegativeSkip(-1)),
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation",
        ),
        (ConsentGateError::NotFound(dialog.clone()), StatusCode::NOT_FOUND, "not_found"),
        (ConsentGateError::Conflict(dialog), StatusCode::CONFLICT, "conflict"),
        (
            ConsentGateError::Storage(StoreError::Io("disk full".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage",
        ),
    ];
    for (err, status, kind) in cases {
        let api = ApiError::from(err);
        assert_eq!(api.status, status);
        assert_eq!(api.kind, kind);
    }
}

#[test]
fn storage_errors_hide_backend_detail_from_clients() {
    let api = ApiError::from(ConsentGateError::Storage(StoreError::Io("disk full".to_string())));
    assert_eq!(api.detail, "internal storage error");
    assert!(api.internal.as_deref().is_some_and(|detail| detail.contains("disk full")));
}

// ============================================================================
// SECTION: CORS
// ============================================================================

#[test]
fn cors_layer_is_only_built_for_configured_origins() {
    assert!(build_cors_layer(&[]).expect("empty").is_none());
    let origins = vec!["http://localhost:3000".to_string()];
    assert!(build_cors_layer(&origins).expect("origins").is_some());
}
