// crates/apiforge-core/src/runtime/expand.rs
// ============================================================================
// Module: apiforge Test Matrix Expander
// Description: Expand authored definitions into ordered generated cases.
// Purpose: Derive negative and validation cases deterministically.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Each authored case expands, in order, into its main case, one
//! missing-field case per required field, one missing-param case per
//! required parameter, and one case per explicit validation entry. Expansion
//! is pure and total over validated definitions; the same definition always
//! yields the same sequence.
//!
//! Derived missing cases copy the parent and change only the removed key,
//! the expected status (entry override or parent status), the description,
//! and the message key. Validation entries overlay their set fields onto the
//! parent; unset fields inherit and tags are the ordered union.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::ApiDefinition;
use crate::core::CaseSource;
use crate::core::CaseVariant;
use crate::core::ExpectedResponse;
use crate::core::GeneratedCase;
use crate::core::RequiredEntry;
use crate::core::TestCase;
use crate::core::ValidationCase;

// ============================================================================
// SECTION: Expansion
// ============================================================================

/// Expands a definition into its ordered test matrix.
#[must_use]
pub fn expand(definition: &ApiDefinition) -> Vec<GeneratedCase> {
    let mut cases = Vec::new();
    for (index, case) in definition.cases.iter().enumerate() {
        expand_case(index, case, &mut cases);
    }
    cases
}

/// Expands one authored case into `out`.
fn expand_case(index: usize, case: &TestCase, out: &mut Vec<GeneratedCase>) {
    let main = GeneratedCase {
        source: CaseSource {
            index,
            method_name: case.method_name.clone(),
        },
        variant: CaseVariant::Main,
        method: case.method,
        data: case.data.clone(),
        params: case.params.clone(),
        // Validated cases always carry a status.
        expect_status: case.expect_status.unwrap_or_default(),
        expected_response: case.expected_response.clone(),
        database_validation: case.database_validation.clone(),
        tags: case.tags.clone(),
        description: case.description.clone(),
        message_key: None,
    };

    let mut field_cases = Vec::with_capacity(case.required_fields.len());
    for entry in &case.required_fields {
        let mut derived = missing_case(&main, entry, "field");
        derived.variant = CaseVariant::MissingField(entry.name.clone());
        derived.data = main.data.as_ref().map(|data| without_key(data, &entry.name));
        field_cases.push(derived);
    }

    let mut param_cases = Vec::with_capacity(case.required_params.len());
    for entry in &case.required_params {
        let mut derived = missing_case(&main, entry, "param");
        derived.variant = CaseVariant::MissingParam(entry.name.clone());
        derived.params = main.params.as_ref().map(|params| without_key(params, &entry.name));
        param_cases.push(derived);
    }

    let validation_cases: Vec<GeneratedCase> = case
        .validations
        .iter()
        .enumerate()
        .map(|(position, validation)| overlay_validation(&main, position, validation))
        .collect();

    out.push(main);
    out.extend(field_cases);
    out.extend(param_cases);
    out.extend(validation_cases);
}

/// Builds a missing-key case from the main case.
fn missing_case(main: &GeneratedCase, entry: &RequiredEntry, label: &str) -> GeneratedCase {
    let mut derived = main.clone();
    derived.expect_status = entry.expect_status.unwrap_or(main.expect_status);
    derived.message_key = entry.message_key.clone();
    derived.description = format!("{} - missing {label} {}", main.description, entry.name);
    derived
}

/// Overlays a validation entry onto the main case.
fn overlay_validation(
    main: &GeneratedCase,
    position: usize,
    validation: &ValidationCase,
) -> GeneratedCase {
    let mut derived = main.clone();
    derived.variant = CaseVariant::ExplicitValidation(position);
    derived.message_key = validation.message_key.clone();
    if let Some(description) = &validation.description {
        derived.description = description.clone();
    } else {
        derived.description = format!("{} - validation {}", main.description, position + 1);
    }
    if let Some(data) = &validation.data {
        derived.data = Some(data.clone());
    }
    if let Some(params) = &validation.params {
        derived.params = Some(params.clone());
    }
    if let Some(status) = validation.expect_status {
        derived.expect_status = status;
    }
    if !matches!(validation.expected_response, ExpectedResponse::Unchecked) {
        derived.expected_response = validation.expected_response.clone();
    }
    if let Some(storage) = &validation.database_validation {
        derived.database_validation = Some(storage.clone());
    }
    for tag in &validation.tags {
        if !derived.tags.contains(tag) {
            derived.tags.push(tag.clone());
        }
    }
    derived
}

/// Returns a copy of the map without `key`, preserving order.
fn without_key(map: &Map<String, Value>, key: &str) -> Map<String, Value> {
    map.iter()
        .filter(|(name, _)| name.as_str() != key)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
