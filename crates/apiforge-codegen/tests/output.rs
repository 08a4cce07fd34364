// crates/apiforge-codegen/tests/output.rs
// ============================================================================
// Module: Artifact Output Tests
// Description: Batch generation, drift checks, and path safety.
// Purpose: Ensure rejected definitions emit nothing and re-runs are clean.
// ============================================================================

//! Artifact output tests for apiforge-codegen.

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

use std::fs;
use std::sync::Mutex;

use apiforge_codegen::ArtifactPaths;
use apiforge_codegen::CodegenError;
use apiforge_codegen::DefinitionStatus;
use apiforge_codegen::OutputMode;
use apiforge_codegen::generate;
use apiforge_core::ApiDefinition;
use apiforge_core::DefinitionLoad;
use apiforge_core::EventSink;
use apiforge_core::GenerationEvent;
use apiforge_core::NoopEventSink;
use apiforge_core::load_definitions;
use apiforge_core::parse_definitions;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Records generation events.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(usize, &'static str)>>,
}

impl EventSink for RecordingSink {
    fn record_generation(&self, event: &GenerationEvent) {
        self.events.lock().unwrap().push((event.definition_index, event.outcome));
    }
}

fn mixed_input() -> Value {
    json!([
        {"pageName": "Broken", "baseRoute": "", "cases": []},
        {
            "pageName": "Orders",
            "folder": "shop",
            "baseRoute": "/orders",
            "cases": [{"methodName": "listOrders", "description": "", "method": "GET", "expectStatus": 200}]
        }
    ])
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn rejected_definitions_emit_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let load = load_definitions(&mixed_input())?;
    let sink = RecordingSink::default();
    let report = generate(&load, dir.path(), OutputMode::Write, &sink)?;

    assert!(!report.is_success());
    assert_eq!(report.outcomes.len(), 2);
    assert!(matches!(report.outcomes[0].status, DefinitionStatus::Rejected(_)));
    assert!(report.violations().iter().any(|violation| violation.field == "baseRoute"));
    assert!(!dir.path().join("Broken").exists());

    let DefinitionStatus::Emitted(written) = &report.outcomes[1].status else {
        panic!("expected emitted artifacts");
    };
    assert_eq!(written.len(), 3);
    for name in ["Orders.models.rs", "Orders.client.rs", "Orders.test.rs"] {
        assert!(dir.path().join("shop").join(name).is_file(), "{name}");
    }
    assert!(!dir.path().join("shop").join("Orders.models.rs.tmp").exists());
    assert_eq!(*sink.events.lock().unwrap(), [(0, "rejected"), (1, "emitted")]);
    Ok(())
}

#[test]
fn rerun_is_unchanged_and_check_detects_drift() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let load = load_definitions(&json!([mixed_input()[1].clone()]))?;
    generate(&load, dir.path(), OutputMode::Write, &NoopEventSink)?;

    let rerun = generate(&load, dir.path(), OutputMode::Write, &NoopEventSink)?;
    assert_eq!(rerun.outcomes[0].status, DefinitionStatus::Unchanged);
    let check = generate(&load, dir.path(), OutputMode::Check, &NoopEventSink)?;
    assert!(check.is_success());

    let client = dir.path().join("shop").join("Orders.client.rs");
    fs::write(&client, "// edited by hand\n")?;
    fs::remove_file(dir.path().join("shop").join("Orders.test.rs"))?;
    let check = generate(&load, dir.path(), OutputMode::Check, &NoopEventSink)?;
    assert!(!check.is_success());
    let DefinitionStatus::Drift(drifted) = &check.outcomes[0].status else {
        panic!("expected drift");
    };
    assert_eq!(drifted.len(), 2);
    assert_eq!(fs::read_to_string(&client)?, "// edited by hand\n");
    Ok(())
}

#[test]
fn unsafe_output_paths_are_rejected_at_load() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let load = load_definitions(&json!([
        {"pageName": "Escape", "folder": "../outside", "baseRoute": "/x",
         "cases": [{"methodName": "m", "description": "", "expectStatus": 200}]},
        {"pageName": "a/b", "baseRoute": "/x",
         "cases": [{"methodName": "m", "description": "", "expectStatus": 200}]},
        mixed_input()[1].clone()
    ]))?;
    assert_eq!(load.indices, [2]);
    assert_eq!(load.rejected[0].violations[0].field, "folder");
    assert_eq!(load.rejected[1].violations[0].field, "pageName");

    let report = generate(&load, dir.path(), OutputMode::Write, &NoopEventSink)?;
    assert!(!report.is_success());
    assert!(matches!(report.outcomes[2].status, DefinitionStatus::Emitted(_)));
    assert!(!dir.path().join("a").exists());
    Ok(())
}

#[test]
fn unresolvable_paths_reject_only_their_definition() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let escape: ApiDefinition = serde_json::from_value(json!({
        "pageName": "Escape", "folder": "../outside", "baseRoute": "/x",
        "cases": [{"methodName": "m", "description": "", "expectStatus": 200}]
    }))?;
    let err = ArtifactPaths::resolve(dir.path(), &escape).unwrap_err();
    assert!(matches!(err, CodegenError::InvalidPath(_)), "{err}");

    let orders = parse_definitions(&json!([mixed_input()[1].clone()]))?.remove(0);
    let load = DefinitionLoad {
        definitions: vec![escape, orders],
        indices: vec![0, 1],
        rejected: Vec::new(),
    };
    let sink = RecordingSink::default();
    let report = generate(&load, dir.path(), OutputMode::Write, &sink)?;
    let DefinitionStatus::Rejected(violations) = &report.outcomes[0].status else {
        panic!("expected the escaping definition to be rejected");
    };
    assert!(violations[0].message.contains("../outside"), "{}", violations[0].message);
    assert!(matches!(report.outcomes[1].status, DefinitionStatus::Emitted(_)));
    assert!(dir.path().join("shop").join("Orders.test.rs").is_file());
    assert_eq!(*sink.events.lock().unwrap(), [(0, "rejected"), (1, "emitted")]);
    Ok(())
}
