// crates/apiforge-core/tests/expander.rs
// ============================================================================
// Module: Test Matrix Expander Tests
// Description: Ordering, derivation, and overlay rules for generated cases.
// Purpose: Ensure expansion is deterministic and derives the expected matrix.
// ============================================================================

//! Test matrix expansion tests.

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

use apiforge_core::ApiDefinition;
use apiforge_core::CaseVariant;
use apiforge_core::ExpectedResponse;
use apiforge_core::HttpMethod;
use apiforge_core::RequiredEntry;
use apiforge_core::TestCase;
use apiforge_core::ValidationCase;
use apiforge_core::expand;
use apiforge_core::parse_definitions;
use proptest::prelude::*;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn signup() -> ApiDefinition {
    let raw = json!([{
        "pageName": "Signup",
        "baseRoute": "/signup",
        "cases": [{
            "methodName": "register",
            "description": "register a user",
            "data": {"email": "a@b.c", "name": "A", "age": 30},
            "params": {"ref": "mail"},
            "expectStatus": 201,
            "tags": ["smoke"],
            "requiredFields": ["email", {"name": "name", "expectStatus": 422, "messageKey": "name.required"}],
            "requiredParams": ["ref"],
            "expectedResponse": {"requiredKeys": ["id"]},
            "validations": [
                {"data": {"email": "bad"}, "expectStatus": 400, "tags": ["negative", "smoke"], "messageKey": "email.invalid"},
                {"expectStatus": 409, "description": "duplicate", "expectedResponse": null}
            ]
        }]
    }]);
    parse_definitions(&raw).unwrap().remove(0)
}

// ============================================================================
// SECTION: Ordering and Derivation
// ============================================================================

#[test]
fn cases_are_grouped_in_declaration_order() {
    let cases = expand(&signup());
    let variants: Vec<CaseVariant> = cases.iter().map(|case| case.variant.clone()).collect();
    assert_eq!(
        variants,
        vec![
            CaseVariant::Main,
            CaseVariant::MissingField("email".to_string()),
            CaseVariant::MissingField("name".to_string()),
            CaseVariant::MissingParam("ref".to_string()),
            CaseVariant::ExplicitValidation(0),
            CaseVariant::ExplicitValidation(1),
        ]
    );
    let names: Vec<String> = cases.iter().map(apiforge_core::GeneratedCase::test_name).collect();
    assert_eq!(
        names,
        vec![
            "register",
            "registerMissingFieldEmail",
            "registerMissingFieldName",
            "registerMissingParamRef",
            "registerValidation1",
            "registerValidation2",
        ]
    );
}

#[test]
fn missing_field_removes_only_the_named_key() {
    let cases = expand(&signup());
    let main = &cases[0];
    let missing = &cases[1];
    let mut expected = main.data.clone().unwrap();
    expected.remove("email");
    assert_eq!(missing.data.as_ref(), Some(&expected));
    assert_eq!(missing.params, main.params);
    assert_eq!(missing.expect_status, 201);
    assert_eq!(missing.message_key, None);
    assert_eq!(missing.description, "register a user - missing field email");
    assert_eq!(missing.expected_response, main.expected_response);
}

#[test]
fn required_entry_overrides_status_and_message_key() {
    let cases = expand(&signup());
    assert_eq!(cases[2].expect_status, 422);
    assert_eq!(cases[2].message_key.as_deref(), Some("name.required"));
    assert_eq!(cases[3].params.as_ref().map(Map::len), Some(0));
    assert_eq!(cases[3].data, cases[0].data);
}

#[test]
fn validation_overlay_inherits_unset_fields() {
    let cases = expand(&signup());
    let first = &cases[4];
    assert_eq!(first.data, Some(json!({"email": "bad"}).as_object().cloned().unwrap()));
    assert_eq!(first.params, cases[0].params);
    assert_eq!(first.expect_status, 400);
    assert_eq!(first.tags, vec!["smoke", "negative"]);
    assert_eq!(first.message_key.as_deref(), Some("email.invalid"));
    assert_eq!(first.expected_response, cases[0].expected_response);

    let second = &cases[5];
    assert_eq!(second.data, cases[0].data);
    assert_eq!(second.description, "duplicate");
    assert_eq!(second.expected_response, ExpectedResponse::Empty);
}

#[test]
fn user_api_with_required_param_expands_to_two_cases() {
    let definition = parse_definitions(&json!([{
        "pageName": "UserApi",
        "baseRoute": "/users/{id}",
        "cases": [{"methodName": "getUser", "description": "", "method": "GET", "params": {"id": 7}, "expectStatus": 200, "requiredParams": ["id"]}]
    }]))
    .unwrap()
    .remove(0);
    let cases = expand(&definition);
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].variant, CaseVariant::Main);
    assert_eq!(cases[1].variant, CaseVariant::MissingParam("id".to_string()));
    assert_eq!(cases[1].params.as_ref().map(Map::is_empty), Some(true));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

fn case_strategy() -> impl Strategy<Value = TestCase> {
    (
        prop::collection::btree_set("[a-z]{1,6}", 0 .. 6),
        prop::collection::btree_set("[a-z]{1,6}", 0 .. 4),
        0usize .. 4,
    )
        .prop_flat_map(|(fields, params, validations)| {
            let field_names: Vec<String> = fields.into_iter().collect();
            let param_names: Vec<String> = params.into_iter().collect();
            let field_count = field_names.len();
            let param_count = param_names.len();
            (
                Just(field_names),
                Just(param_names),
                prop::sample::subsequence((0 .. field_count).collect::<Vec<_>>(), 0 ..= field_count),
                prop::sample::subsequence((0 .. param_count).collect::<Vec<_>>(), 0 ..= param_count),
                Just(validations),
            )
        })
        .prop_map(|(fields, params, required_fields, required_params, validations)| {
            let data: Map<String, Value> =
                fields.iter().map(|name| (name.clone(), json!(name.len()))).collect();
            let param_map: Map<String, Value> =
                params.iter().map(|name| (name.clone(), json!(name))).collect();
            TestCase {
                method_name: "call".to_string(),
                description: String::new(),
                method: HttpMethod::Post,
                data: Some(data),
                params: Some(param_map),
                expect_status: Some(200),
                tags: Vec::new(),
                required_fields: required_fields
                    .into_iter()
                    .map(|index| RequiredEntry::named(fields[index].clone()))
                    .collect(),
                required_params: required_params
                    .into_iter()
                    .map(|index| RequiredEntry::named(params[index].clone()))
                    .collect(),
                validations: (0 .. validations)
                    .map(|index| ValidationCase {
                        description: None,
                        data: None,
                        params: None,
                        expect_status: Some(400 + u16::try_from(index).unwrap()),
                        tags: Vec::new(),
                        expected_response: ExpectedResponse::Unchecked,
                        database_validation: None,
                        message_key: None,
                    })
                    .collect(),
                expected_response: ExpectedResponse::Unchecked,
                database_validation: None,
            }
        })
}

proptest! {
    #[test]
    fn expansion_count_matches_entries(case in case_strategy()) {
        let expected = 1 + case.required_fields.len() + case.required_params.len() + case.validations.len();
        let definition = ApiDefinition {
            page_name: "Prop".to_string(),
            folder: None,
            base_route: "/p".to_string(),
            cases: vec![case.clone()],
        };
        let cases = expand(&definition);
        prop_assert_eq!(cases.len(), expected);
        prop_assert_eq!(&cases, &expand(&definition));
        for (generated, entry) in cases[1 ..= case.required_fields.len()].iter().zip(&case.required_fields) {
            let data = generated.data.as_ref().unwrap();
            prop_assert!(!data.contains_key(&entry.name));
            prop_assert_eq!(data.len() + 1, case.data.as_ref().unwrap().len());
        }
    }
}
