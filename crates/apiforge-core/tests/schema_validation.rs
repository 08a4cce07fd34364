// crates/apiforge-core/tests/schema_validation.rs
// ============================================================================
// Module: Schema Validation Tests
// Description: Static validation and partial loading of API definitions.
// Purpose: Ensure every authoring mistake is reported with its location.
// ============================================================================

//! Schema model validation tests.

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

use std::io::Write;

use apiforge_core::ExpectedResponse;
use apiforge_core::HttpMethod;
use apiforge_core::IssueMetadata;
use apiforge_core::RequiredEntry;
use apiforge_core::SchemaError;
use apiforge_core::load_definitions;
use apiforge_core::parse_definitions;
use apiforge_core::read_definitions;
use apiforge_core::scaffold_definition;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn user_api() -> Value {
    json!({
        "pageName": "UserApi",
        "baseRoute": "/users/{id}",
        "cases": [{
            "methodName": "getUser",
            "description": "fetch a user",
            "method": "GET",
            "params": {"id": 7},
            "expectStatus": 200,
            "requiredParams": ["id"]
        }]
    })
}

fn fields(err: &SchemaError) -> Vec<String> {
    err.violations().iter().map(|violation| violation.field.clone()).collect()
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn valid_definition_parses_with_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let definitions = parse_definitions(&json!([user_api()]))?;
    assert_eq!(definitions.len(), 1);
    let case = &definitions[0].cases[0];
    assert_eq!(case.method, HttpMethod::Get);
    assert_eq!(case.required_params, vec![RequiredEntry::named("id")]);
    assert_eq!(case.expected_response, ExpectedResponse::Unchecked);
    assert_eq!(definitions[0].output_dir(), "UserApi");
    Ok(())
}

#[test]
fn method_defaults_to_post() -> Result<(), Box<dyn std::error::Error>> {
    let raw = json!([{
        "pageName": "Orders",
        "baseRoute": "/orders",
        "cases": [{"methodName": "create", "description": "", "data": {"sku": "a"}, "expectStatus": 201}]
    }]);
    let definitions = parse_definitions(&raw)?;
    assert_eq!(definitions[0].cases[0].method, HttpMethod::Post);
    Ok(())
}

#[test]
fn explicit_null_response_is_distinct_from_absent() -> Result<(), Box<dyn std::error::Error>> {
    let mut raw = user_api();
    raw["cases"][0]["expectedResponse"] = Value::Null;
    let definitions = parse_definitions(&json!([raw]))?;
    assert_eq!(definitions[0].cases[0].expected_response, ExpectedResponse::Empty);
    Ok(())
}

#[test]
fn required_entry_record_form_is_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let raw = json!([{
        "pageName": "Signup",
        "baseRoute": "/signup",
        "cases": [{
            "methodName": "register",
            "description": "",
            "data": {"email": "a@b.c", "name": "A"},
            "expectStatus": 201,
            "requiredFields": ["name", {"name": "email", "expectStatus": 422, "messageKey": "email.required"}]
        }]
    }]);
    let definitions = parse_definitions(&raw)?;
    let entries = &definitions[0].cases[0].required_fields;
    assert_eq!(entries[0], RequiredEntry::named("name"));
    assert_eq!(entries[1].expect_status, Some(422));
    assert_eq!(entries[1].message_key.as_deref(), Some("email.required"));
    Ok(())
}

// ============================================================================
// SECTION: Violations
// ============================================================================

#[test]
fn all_violations_in_a_definition_are_collected() {
    let raw = json!([{
        "pageName": "",
        "baseRoute": "",
        "cases": [
            {
                "methodName": "a",
                "description": "",
                "data": {"x": 1},
                "expectStatus": 200,
                "requiredFields": ["y"],
                "validations": [{"data": {}}]
            },
            {"methodName": "a", "description": "", "expectStatus": 200}
        ]
    }]);
    let err = parse_definitions(&raw).unwrap_err();
    let fields = fields(&err);
    assert!(fields.contains(&"pageName".to_string()));
    assert!(fields.contains(&"baseRoute".to_string()));
    assert!(fields.contains(&"cases[0].requiredFields[0]".to_string()));
    assert!(fields.contains(&"cases[0].validations[0].expectStatus".to_string()));
    assert!(fields.contains(&"cases[1].methodName".to_string()));
    assert_eq!(err.violations().len(), 5);
}

#[test]
fn missing_case_status_is_reported_beside_other_violations() {
    let raw = json!([{
        "pageName": "",
        "baseRoute": "",
        "cases": [
            {
                "methodName": "a",
                "description": "",
                "data": {"x": 1},
                "requiredFields": ["nope"],
                "validations": [{"data": {}}]
            },
            {"methodName": "a", "description": "", "expectStatus": 200}
        ]
    }]);
    let err = parse_definitions(&raw).unwrap_err();
    let fields = fields(&err);
    assert_eq!(fields, [
        "pageName",
        "baseRoute",
        "cases[0].expectStatus",
        "cases[0].requiredFields[0]",
        "cases[0].validations[0].expectStatus",
        "cases[1].methodName",
    ]);
    assert_eq!(err.violations()[2].message, "is required");
}

#[test]
fn malformed_case_does_not_hide_sibling_violations() -> Result<(), Box<dyn std::error::Error>> {
    let raw = json!([{
        "pageName": "Orders",
        "baseRoute": "",
        "cases": [
            {"methodName": "list", "description": "", "expectStatus": "ok"},
            {"methodName": "list", "description": "", "expectStatus": 700}
        ]
    }]);
    let load = load_definitions(&raw)?;
    assert!(load.definitions.is_empty());
    let violations = &load.rejected[0].violations;
    let fields: Vec<&str> = violations.iter().map(|violation| violation.field.as_str()).collect();
    assert_eq!(fields, ["baseRoute", "cases[0]", "cases[1].methodName", "cases[1].expectStatus"]);
    assert!(violations[1].message.contains("invalid type"), "{}", violations[1].message);
    Ok(())
}

#[test]
fn unknown_fields_are_reported_per_case() -> Result<(), Box<dyn std::error::Error>> {
    let mut raw = user_api();
    raw["cases"][0]["requiredField"] = json!(["id"]);
    raw["cases"][0]["expectStatus"] = json!(99);
    raw["baseRoot"] = json!("/users");
    let load = load_definitions(&json!([raw]))?;
    let violations = &load.rejected[0].violations;
    let field_names: Vec<&str> = violations.iter().map(|violation| violation.field.as_str()).collect();
    assert_eq!(field_names, ["<definition>", "cases[0]"]);
    let messages: Vec<&str> =
        violations.iter().map(|violation| violation.message.as_str()).collect();
    assert!(messages[0].contains("unknown field `baseRoot`"), "{}", messages[0]);
    assert!(messages[1].contains("unknown field `requiredField`"), "{}", messages[1]);

    let mut nested = user_api();
    nested["cases"][0]["expectedResponse"] = json!({"requiredKey": ["id"]});
    nested["cases"][0]["databaseValidation"] = json!({"table": "users", "were": {}});
    let err = parse_definitions(&json!([nested])).unwrap_err();
    assert_eq!(fields(&err), ["cases[0]"]);
    Ok(())
}

#[test]
fn blank_page_names_are_not_echoed() -> Result<(), Box<dyn std::error::Error>> {
    let load = load_definitions(&json!([{"pageName": "  ", "baseRoute": "/x", "cases": []}]))?;
    let rejected = &load.rejected[0];
    assert_eq!(rejected.page_name, None);
    assert!(rejected.violations.iter().all(|violation| violation.page_name.is_none()));
    assert_eq!(
        rejected.violations[0].to_string(),
        "definition[0] pageName: must be present and non-empty"
    );
    Ok(())
}

#[test]
fn page_names_and_folders_must_be_safe_paths() -> Result<(), Box<dyn std::error::Error>> {
    let case = json!({"methodName": "m", "description": "", "expectStatus": 200});
    let load = load_definitions(&json!([
        {"pageName": "users/list", "baseRoute": "/u", "cases": [case.clone()]},
        {"pageName": "..", "baseRoute": "/u", "cases": [case.clone()]},
        {"pageName": "Abs", "folder": "/etc", "baseRoute": "/u", "cases": [case.clone()]},
        {"pageName": "Up", "folder": "shop/../..", "baseRoute": "/u", "cases": [case.clone()]},
        {"pageName": "Nested", "folder": "shop/orders", "baseRoute": "/u", "cases": [case]}
    ]))?;
    assert_eq!(load.indices, [4]);
    let fields: Vec<&str> =
        load.rejected.iter().map(|rejected| rejected.violations[0].field.as_str()).collect();
    assert_eq!(fields, ["pageName", "pageName", "folder", "folder"]);
    Ok(())
}

#[test]
fn empty_cases_and_bad_storage_rules_are_rejected() {
    let raw = json!([
        {"pageName": "Empty", "baseRoute": "/e", "cases": []},
        {
            "pageName": "Store",
            "baseRoute": "/s",
            "cases": [{
                "methodName": "save",
                "description": "",
                "expectStatus": 200,
                "databaseValidation": {
                    "table": "users",
                    "query": "SELECT 1",
                    "where": {},
                    "compareWith": "customData",
                    "expectedData": {"id": 5}
                }
            }]
        },
        {
            "pageName": "Neither",
            "baseRoute": "/n",
            "cases": [{
                "methodName": "save",
                "description": "",
                "expectStatus": 200,
                "databaseValidation": {"where": {}}
            }]
        }
    ]);
    let err = parse_definitions(&raw).unwrap_err();
    let fields = fields(&err);
    assert!(fields.contains(&"cases".to_string()));
    assert!(fields.contains(&"cases[0].databaseValidation".to_string()));
    assert!(fields.contains(&"cases[0].databaseValidation.customData".to_string()));
    assert!(fields.contains(&"cases[0].databaseValidation.expectedData.id".to_string()));
    let indices: Vec<usize> =
        err.violations().iter().map(|violation| violation.definition_index).collect();
    assert!(indices.contains(&0));
    assert!(indices.contains(&1));
    assert!(indices.contains(&2));
}

#[test]
fn duplicate_page_names_reject_the_later_definition() -> Result<(), Box<dyn std::error::Error>> {
    let load = load_definitions(&json!([user_api(), user_api()]))?;
    assert_eq!(load.definitions.len(), 1);
    assert_eq!(load.rejected.len(), 1);
    assert_eq!(load.rejected[0].index, 1);
    assert_eq!(load.rejected[0].violations[0].field, "pageName");
    Ok(())
}

#[test]
fn partial_load_keeps_valid_definitions() -> Result<(), Box<dyn std::error::Error>> {
    let broken = json!({"pageName": "Broken", "baseRoute": "/b", "cases": [{"methodName": 5}]});
    let load = load_definitions(&json!([broken, user_api()]))?;
    assert_eq!(load.definitions.len(), 1);
    assert_eq!(load.definitions[0].page_name, "UserApi");
    assert_eq!(load.rejected.len(), 1);
    assert_eq!(load.rejected[0].page_name.as_deref(), Some("Broken"));
    assert!(load.into_result().is_err());
    Ok(())
}

#[test]
fn non_sequence_input_is_an_input_error() {
    let err = load_definitions(&json!("nope")).unwrap_err();
    assert!(matches!(err, SchemaError::Input(_)));
}

#[test]
fn violation_listing_names_definition_and_field() {
    let err = parse_definitions(&json!([{"pageName": "X", "baseRoute": "/x", "cases": []}]))
        .unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("1 violation(s)"));
    assert!(rendered.contains("definition[0] (X) cases"));
}

// ============================================================================
// SECTION: Files and Scaffolding
// ============================================================================

#[test]
fn yaml_and_json_files_are_read_by_extension() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let yaml_path = dir.path().join("defs.yaml");
    let mut file = std::fs::File::create(&yaml_path)?;
    writeln!(
        file,
        "- pageName: UserApi\n  baseRoute: /users/{{id}}\n  cases:\n    - methodName: getUser\n      description: fetch\n      method: GET\n      params:\n        id: 7\n      expectStatus: 200\n"
    )?;
    let json_path = dir.path().join("defs.json");
    std::fs::write(&json_path, serde_json::to_vec(&json!([user_api()]))?)?;

    let from_yaml = parse_definitions(&read_definitions(&yaml_path)?)?;
    let from_json = parse_definitions(&read_definitions(&json_path)?)?;
    assert_eq!(from_yaml[0].base_route, "/users/{id}");
    assert_eq!(from_yaml[0].cases[0].method_name, from_json[0].cases[0].method_name);
    Ok(())
}

#[test]
fn scaffold_produces_a_valid_definition() -> Result<(), Box<dyn std::error::Error>> {
    let issue: IssueMetadata = serde_json::from_value(json!({
        "key": "API-42",
        "title": "List active users",
        "description": "Return only active accounts",
        "type": "Story",
        "priority": "High"
    }))?;
    let definition = scaffold_definition(&issue);
    assert_eq!(definition.page_name, "ListActiveUsers");
    assert_eq!(definition.base_route, "/list-active-users");
    assert_eq!(definition.output_dir(), "API-42");
    assert_eq!(definition.cases[0].method_name, "listActiveUsers");
    assert_eq!(definition.cases[0].tags, vec!["API-42", "story", "high"]);
    let reparsed = parse_definitions(&serde_json::to_value(vec![definition])?)?;
    assert_eq!(reparsed.len(), 1);
    Ok(())
}
