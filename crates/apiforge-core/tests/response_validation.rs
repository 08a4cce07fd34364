// crates/apiforge-core/tests/response_validation.rs
// ============================================================================
// Module: Response Validation Tests
// Description: Status, empty-body, and rule evaluation for responses.
// Purpose: Ensure failures accumulate without short-circuiting.
// ============================================================================

//! Response validation engine tests.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

use apiforge_core::ExpectedResponse;
use apiforge_core::FailureKind;
use apiforge_core::ResponseRule;
use apiforge_core::StatusExpectation;
use apiforge_core::check_message;
use apiforge_core::validate_response;
use serde_json::Value;
use serde_json::json;

fn rule(raw: Value) -> ExpectedResponse {
    ExpectedResponse::Rule(serde_json::from_value::<ResponseRule>(raw).unwrap())
}

const OK: StatusExpectation = StatusExpectation {
    expected: 200,
    actual: 200,
};

fn kinds(result: &apiforge_core::ValidationResult) -> Vec<FailureKind> {
    result.failures.iter().map(|failure| failure.kind).collect()
}

// ============================================================================
// SECTION: Status and Empty Bodies
// ============================================================================

#[test]
fn wrong_status_and_missing_key_yield_two_failures() {
    let body = json!({"name": "A"});
    let result = validate_response(
        Some(&body),
        &rule(json!({"requiredKeys": ["id"]})),
        StatusExpectation {
            expected: 200,
            actual: 500,
        },
    );
    assert_eq!(kinds(&result), vec![FailureKind::Status, FailureKind::MissingKey]);
    assert_eq!(result.failures[0].expected, "200");
    assert_eq!(result.failures[0].actual, "500");
}

#[test]
fn empty_expectation_rejects_any_body_regardless_of_status() {
    let body = json!({"unexpected": true});
    let result = validate_response(Some(&body), &ExpectedResponse::Empty, OK);
    assert_eq!(kinds(&result), vec![FailureKind::UnexpectedBody]);

    let result = validate_response(
        Some(&body),
        &ExpectedResponse::Empty,
        StatusExpectation {
            expected: 204,
            actual: 200,
        },
    );
    assert_eq!(kinds(&result), vec![FailureKind::Status, FailureKind::UnexpectedBody]);
}

#[test]
fn empty_expectation_accepts_absent_null_and_blank_bodies() {
    assert!(validate_response(None, &ExpectedResponse::Empty, OK).is_ok());
    assert!(validate_response(Some(&Value::Null), &ExpectedResponse::Empty, OK).is_ok());
    assert!(validate_response(Some(&json!("  ")), &ExpectedResponse::Empty, OK).is_ok());
}

#[test]
fn unchecked_expectation_only_checks_status() {
    let body = json!([1, 2, 3]);
    assert!(validate_response(Some(&body), &ExpectedResponse::Unchecked, OK).is_ok());
}

// ============================================================================
// SECTION: Rules
// ============================================================================

#[test]
fn structure_compares_shapes_recursively() {
    let expected = rule(json!({
        "structure": {"user": {"id": 0, "roles": [""]}, "items": [{"id": 0}]}
    }));
    let body = json!({
        "user": {"id": "not-a-number-but-primitive", "roles": ["a", {"bad": 1}]},
        "items": [{"id": 1}, {"id": [2]}, {}]
    });
    let result = validate_response(Some(&body), &expected, OK);
    let paths: Vec<&str> = result.failures.iter().map(|failure| failure.path.as_str()).collect();
    assert_eq!(paths, vec!["user.roles[1]", "items[1].id", "items[2].id"]);
    assert!(result.failures.iter().all(|failure| failure.kind == FailureKind::Structure));
    assert_eq!(result.failures[2].actual, "missing");
}

#[test]
fn required_keys_accept_null_values() {
    let body = json!({"user": {"nick": null, "items": [{"id": 1}]}});
    let expected = rule(json!({"requiredKeys": ["user.nick", "user.items.0.id", "user.items[0].id"]}));
    assert!(validate_response(Some(&body), &expected, OK).is_ok());
}

#[test]
fn data_types_treat_arrays_as_objects() {
    let body = json!({"id": 1, "name": "A", "ok": true, "list": [], "meta": {}, "nick": null});
    let expected = rule(json!({
        "dataTypes": {"id": "number", "name": "string", "ok": "boolean", "list": "object", "meta": "object", "nick": "string", "gone": "number"}
    }));
    let result = validate_response(Some(&body), &expected, OK);
    let paths: Vec<&str> = result.failures.iter().map(|failure| failure.path.as_str()).collect();
    assert_eq!(paths, vec!["gone", "nick"]);
    assert_eq!(result.failures[1].actual, "null");
}

#[test]
fn values_use_strict_equality_with_decimal_numbers() {
    let body = json!({"count": 1.0, "flag": 1, "name": "A", "tags": ["x"]});
    let expected = rule(json!({
        "values": {"count": 1, "flag": true, "name": "A", "tags": ["x"], "missing": 0}
    }));
    let result = validate_response(Some(&body), &expected, OK);
    let paths: Vec<&str> = result.failures.iter().map(|failure| failure.path.as_str()).collect();
    assert_eq!(paths, vec!["flag", "missing"]);
}

#[test]
fn array_validation_checks_bounds_and_items() {
    let body = json!({"items": [{"id": 1}, {"id": 2}, 3]});
    let expected = rule(json!({
        "arrayValidation": {"path": "items", "minLength": 4, "maxLength": 2, "itemStructure": {"id": 0}}
    }));
    let result = validate_response(Some(&body), &expected, OK);
    assert_eq!(
        kinds(&result),
        vec![FailureKind::Length, FailureKind::Length, FailureKind::Structure]
    );
    assert_eq!(result.failures[2].path, "items[2]");
}

#[test]
fn array_validation_on_non_array_fails() {
    let body = json!({"items": {"id": 1}});
    let expected = rule(json!({"arrayValidation": {"path": "items", "minLength": 0}}));
    let result = validate_response(Some(&body), &expected, OK);
    assert_eq!(kinds(&result), vec![FailureKind::NotAnArray]);
    assert_eq!(result.failures[0].actual, "object");
}

#[test]
fn array_validation_defaults_to_root_body() {
    let body = json!([1, 2]);
    let expected = rule(json!({"arrayValidation": {"minLength": 1, "maxLength": 2}}));
    assert!(validate_response(Some(&body), &expected, OK).is_ok());
}

#[test]
fn json_path_keys_select_first_match() {
    let body = json!({"items": [{"id": 9}, {"id": 10}]});
    let expected = rule(json!({"values": {"$.items[*].id": 9}}));
    assert!(validate_response(Some(&body), &expected, OK).is_ok());
}

#[test]
fn message_check_compares_configured_field() {
    let body = json!({"error": {"code": "email.required"}});
    assert!(check_message(Some(&body), "error.code", "email.required").is_none());
    let failure = check_message(Some(&body), "error.code", "name.required").unwrap();
    assert_eq!(failure.kind, FailureKind::Message);
    assert_eq!(failure.actual, "\"email.required\"");
    let failure = check_message(None, "error.code", "x").unwrap();
    assert_eq!(failure.actual, "missing");
}
