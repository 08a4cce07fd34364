// crates/apiforge-core/tests/hashing.rs
// ============================================================================
// Module: Definition Digest Tests
// Description: Canonical digests of API definitions.
// ============================================================================

//! Validates that definition digests ignore authoring layout.

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

use apiforge_core::definition_digest;
use apiforge_core::parse_definitions;
use serde_json::json;

#[test]
fn digest_is_stable_across_key_order() -> Result<(), Box<dyn std::error::Error>> {
    let first = parse_definitions(&json!([{
        "pageName": "A", "baseRoute": "/a",
        "cases": [{"methodName": "m", "description": "", "data": {"x": 1, "y": 2}, "expectStatus": 200}]
    }]))?;
    let second = parse_definitions(&json!([{
        "cases": [{"expectStatus": 200, "data": {"y": 2, "x": 1}, "description": "", "methodName": "m"}],
        "baseRoute": "/a", "pageName": "A"
    }]))?;
    let digest = definition_digest(&first[0])?;
    assert_eq!(digest, definition_digest(&second[0])?);
    assert_eq!(digest.algorithm, "sha256");
    assert_eq!(digest.value.len(), 64);
    assert!(digest.to_string().starts_with("sha256:"));
    Ok(())
}

#[test]
fn digest_changes_with_content() -> Result<(), Box<dyn std::error::Error>> {
    let definitions = parse_definitions(&json!([
        {"pageName": "A", "baseRoute": "/a", "cases": [{"methodName": "m", "description": "", "expectStatus": 200}]},
        {"pageName": "B", "baseRoute": "/a", "cases": [{"methodName": "m", "description": "", "expectStatus": 200}]}
    ]))?;
    assert_ne!(definition_digest(&definitions[0])?, definition_digest(&definitions[1])?);
    Ok(())
}
