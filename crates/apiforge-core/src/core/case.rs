// crates/apiforge-core/src/core/case.rs
// ============================================================================
// Module: apiforge Generated Cases
// Description: Concrete test cases derived from authored definitions.
// Purpose: Carry everything one emitted test needs to execute and assert.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`GeneratedCase`] is one row of the test matrix: the main case of an
//! authored [`crate::TestCase`], a derived missing-field or missing-param
//! case, or an explicit validation variant. Generated cases are immutable and
//! serializable so emitted tests can embed them verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::schema::ExpectedResponse;
use crate::core::schema::HttpMethod;
use crate::core::schema::StorageRule;

// ============================================================================
// SECTION: Case Identity
// ============================================================================

/// Authored case a generated case was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSource {
    /// Index of the authored case within its definition.
    pub index: usize,
    /// Method name of the authored case.
    pub method_name: String,
}

/// Variant of a generated case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "camelCase")]
pub enum CaseVariant {
    /// The authored case unchanged.
    Main,
    /// Request body with the named field removed.
    MissingField(String),
    /// Parameters with the named parameter removed.
    MissingParam(String),
    /// Explicit validation entry at the given index.
    ExplicitValidation(usize),
}

impl CaseVariant {
    /// Returns the capitalized name suffix for this variant.
    #[must_use]
    pub fn suffix(&self) -> String {
        match self {
            Self::Main => String::new(),
            Self::MissingField(name) => format!("MissingField{}", pascal_case(name)),
            Self::MissingParam(name) => format!("MissingParam{}", pascal_case(name)),
            Self::ExplicitValidation(index) => format!("Validation{}", index + 1),
        }
    }
}

impl fmt::Display for CaseVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::MissingField(name) => write!(f, "missingField({name})"),
            Self::MissingParam(name) => write!(f, "missingParam({name})"),
            Self::ExplicitValidation(index) => write!(f, "explicitValidation({index})"),
        }
    }
}

// ============================================================================
// SECTION: Generated Case
// ============================================================================

/// One concrete test case in the expanded matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCase {
    /// Authored case this was derived from.
    pub source: CaseSource,
    /// Variant of this case.
    pub variant: CaseVariant,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request body template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Parameter template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    /// Expected HTTP status.
    pub expect_status: u16,
    /// Expected response assertion.
    #[serde(default, skip_serializing_if = "ExpectedResponse::is_unchecked")]
    pub expected_response: ExpectedResponse,
    /// Expected storage side effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_validation: Option<StorageRule>,
    /// Case tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Expected message key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_key: Option<String>,
}

impl GeneratedCase {
    /// Returns the camel-case test name (`methodName` + variant suffix).
    #[must_use]
    pub fn test_name(&self) -> String {
        format!("{}{}", self.source.method_name, self.variant.suffix())
    }

    /// Returns the Pascal-case model base name for this case.
    ///
    /// Missing-field and missing-param cases share the models of their parent.
    #[must_use]
    pub fn model_name(&self) -> String {
        let base = pascal_case(&self.source.method_name);
        match &self.variant {
            CaseVariant::ExplicitValidation(_) => format!("{base}{}", self.variant.suffix()),
            _ => base,
        }
    }
}

// ============================================================================
// SECTION: Naming
// ============================================================================

/// Converts an identifier such as `getUser` or `user_id` to `GetUser`/`UserId`.
///
/// Non-alphanumeric characters split segments; inner casing is preserved.
#[must_use]
pub fn pascal_case(value: &str) -> String {
    let mut output = String::new();
    for segment in value.split(|ch: char| !ch.is_ascii_alphanumeric()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            output.push(first.to_ascii_uppercase());
            output.extend(chars);
        }
    }
    if output.starts_with(|ch: char| ch.is_ascii_digit()) {
        output.insert(0, 'N');
    }
    if output.is_empty() { "Case".to_string() } else { output }
}

/// Converts an identifier such as `getUserMissingFieldName` to snake case.
#[must_use]
pub fn snake_case(value: &str) -> String {
    let mut output = String::new();
    let mut previous_lower = false;
    for ch in value.chars() {
        if ch.is_ascii_uppercase() {
            if previous_lower {
                output.push('_');
            }
            output.push(ch.to_ascii_lowercase());
            previous_lower = false;
        } else if ch.is_ascii_alphanumeric() {
            output.push(ch);
            previous_lower = true;
        } else if !output.ends_with('_') && !output.is_empty() {
            output.push('_');
            previous_lower = false;
        }
    }
    let trimmed = output.trim_end_matches('_');
    if trimmed.is_empty() {
        "case".to_string()
    } else if trimmed.starts_with(|ch: char| ch.is_ascii_digit()) {
        format!("n_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::pascal_case;
    use super::snake_case;

    #[test]
    fn naming_helpers_handle_camel_and_snake_input() {
        assert_eq!(pascal_case("getUser"), "GetUser");
        assert_eq!(pascal_case("user_id"), "UserId");
        assert_eq!(snake_case("getUserMissingParamId"), "get_user_missing_param_id");
        assert_eq!(snake_case("createOrderValidation2"), "create_order_validation2");
        assert_eq!(snake_case("user-id"), "user_id");
    }
}
