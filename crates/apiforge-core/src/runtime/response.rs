// crates/apiforge-core/src/runtime/response.rs
// ============================================================================
// Module: apiforge Response Validation
// Description: Evaluate HTTP responses against declarative response rules.
// Purpose: Produce every assertion failure for a response in one pass.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Response validation accumulates [`Failure`] records instead of stopping at
//! the first problem. The status check always runs. An explicit empty-body
//! assertion rejects any non-empty body; otherwise each configured sub-rule
//! (structure, required keys, data types, values, array checks) contributes
//! its own failures.
//!
//! Failures are data, not errors: infrastructure faults never appear here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::core::ArrayValidation;
use crate::core::ExpectedResponse;
use crate::core::FieldPath;
use crate::core::ResponseRule;
use crate::core::ShapeClass;
use crate::core::is_empty_body;
use crate::core::strict_equals;
use crate::core::value_kind;

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Classification of an assertion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// HTTP status differs from the expected status.
    Status,
    /// A body was returned where none was expected.
    UnexpectedBody,
    /// Shape class differs from the structure template.
    Structure,
    /// A required path is missing.
    MissingKey,
    /// A value has the wrong runtime type.
    DataType,
    /// A value differs from the expected literal.
    Value,
    /// An array check targeted a non-array.
    NotAnArray,
    /// An array length is outside its bounds.
    Length,
    /// Message field differs from the expected message key.
    Message,
    /// Storage row count differs from the expected count.
    RowCount,
    /// Storage column differs from the expected value.
    Column,
    /// Storage lookup returned no row to compare.
    NoRows,
}

impl FailureKind {
    /// Returns a stable label for this failure kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::UnexpectedBody => "unexpected_body",
            Self::Structure => "structure",
            Self::MissingKey => "missing_key",
            Self::DataType => "data_type",
            Self::Value => "value",
            Self::NotAnArray => "not_an_array",
            Self::Length => "length",
            Self::Message => "message",
            Self::RowCount => "row_count",
            Self::Column => "column",
            Self::NoRows => "no_rows",
        }
    }
}

/// One assertion failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Failure classification.
    pub kind: FailureKind,
    /// Path, column, or subject the failure refers to.
    pub path: String,
    /// Expected value or shape, rendered.
    pub expected: String,
    /// Actual value or shape, rendered.
    pub actual: String,
}

impl Failure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(
        kind: FailureKind,
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { self.path.as_str() };
        write!(
            f,
            "{} at {path}: expected {}, found {}",
            self.kind.as_str(),
            self.expected,
            self.actual
        )
    }
}

/// Accumulated validation outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Failures in evaluation order.
    pub failures: Vec<Failure>,
}

impl ValidationResult {
    /// Returns true when no failure was recorded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records a failure.
    pub fn push(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    /// Appends the failures of another result.
    pub fn merge(&mut self, other: Self) {
        self.failures.extend(other.failures);
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return f.write_str("ok");
        }
        write!(f, "{} failure(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

/// Expected and received HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusExpectation {
    /// Expected status.
    pub expected: u16,
    /// Received status.
    pub actual: u16,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a response body and status against an expected response.
#[must_use]
pub fn validate_response(
    body: Option<&Value>,
    expected: &ExpectedResponse,
    status: StatusExpectation,
) -> ValidationResult {
    let mut result = ValidationResult::default();
    if status.expected != status.actual {
        result.push(Failure::new(
            FailureKind::Status,
            "status",
            status.expected.to_string(),
            status.actual.to_string(),
        ));
    }
    match expected {
        ExpectedResponse::Unchecked => {}
        ExpectedResponse::Empty => {
            if !is_empty_body(body) {
                let actual = body.map_or_else(|| "absent".to_string(), render);
                result.push(Failure::new(FailureKind::UnexpectedBody, "", "empty body", actual));
            }
        }
        ExpectedResponse::Rule(rule) => {
            validate_rule(body.unwrap_or(&Value::Null), rule, &mut result);
        }
    }
    result
}

/// Checks a configured message field against the expected message key.
#[must_use]
pub fn check_message(body: Option<&Value>, field: &str, expected_key: &str) -> Option<Failure> {
    let path = FieldPath::parse(field);
    let actual = body.and_then(|body| path.lookup(body));
    match actual {
        Some(Value::String(text)) if text == expected_key => None,
        Some(other) => {
            Some(Failure::new(FailureKind::Message, path.as_str(), expected_key, render(other)))
        }
        None => Some(Failure::new(FailureKind::Message, path.as_str(), expected_key, "missing")),
    }
}

/// Evaluates every configured sub-rule.
fn validate_rule(actual: &Value, rule: &ResponseRule, result: &mut ValidationResult) {
    if let Some(template) = &rule.structure {
        check_shape(template, actual, "", result);
    }
    for key in &rule.required_keys {
        let path = FieldPath::parse(key);
        if path.lookup(actual).is_none() {
            result.push(Failure::new(FailureKind::MissingKey, key.as_str(), "present", "missing"));
        }
    }
    for (key, data_type) in &rule.data_types {
        match FieldPath::parse(key).lookup(actual) {
            Some(value) if data_type.matches(value) => {}
            Some(value) => result.push(Failure::new(
                FailureKind::DataType,
                key.as_str(),
                data_type.as_str(),
                value_kind(value),
            )),
            None => result.push(Failure::new(
                FailureKind::DataType,
                key.as_str(),
                data_type.as_str(),
                "missing",
            )),
        }
    }
    for (key, expected) in &rule.values {
        match FieldPath::parse(key).lookup(actual) {
            Some(value) if strict_equals(expected, value) => {}
            Some(value) => result.push(Failure::new(
                FailureKind::Value,
                key.as_str(),
                render(expected),
                render(value),
            )),
            None => result.push(Failure::new(
                FailureKind::Value,
                key.as_str(),
                render(expected),
                "missing",
            )),
        }
    }
    if let Some(array) = &rule.array_validation {
        check_array(actual, array, result);
    }
}

/// Applies array length and item-structure checks.
fn check_array(actual: &Value, rule: &ArrayValidation, result: &mut ValidationResult) {
    let path = FieldPath::parse(rule.path.as_deref().unwrap_or(""));
    let label = path.as_str().to_string();
    let Some(Value::Array(items)) = path.lookup(actual) else {
        let found = path.lookup(actual).map_or("missing", value_kind);
        result.push(Failure::new(FailureKind::NotAnArray, label, "array", found));
        return;
    };
    if let Some(min) = rule.min_length
        && items.len() < min
    {
        result.push(Failure::new(
            FailureKind::Length,
            label.clone(),
            format!("length >= {min}"),
            items.len().to_string(),
        ));
    }
    if let Some(max) = rule.max_length
        && items.len() > max
    {
        result.push(Failure::new(
            FailureKind::Length,
            label.clone(),
            format!("length <= {max}"),
            items.len().to_string(),
        ));
    }
    if let Some(template) = &rule.item_structure {
        for (index, item) in items.iter().enumerate() {
            check_shape(template, item, &format!("{label}[{index}]"), result);
        }
    }
}

/// Compares shape classes recursively against a structure template.
///
/// Arrays are checked element-wise against the template's first element.
fn check_shape(template: &Value, actual: &Value, path: &str, result: &mut ValidationResult) {
    let expected_class = ShapeClass::of(template);
    let actual_class = ShapeClass::of(actual);
    if expected_class != actual_class {
        result.push(Failure::new(
            FailureKind::Structure,
            path,
            expected_class.to_string(),
            actual_class.to_string(),
        ));
        return;
    }
    match (template, actual) {
        (Value::Object(template), Value::Object(actual)) => {
            for (key, child) in template {
                let child_path =
                    if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                match actual.get(key) {
                    Some(value) => check_shape(child, value, &child_path, result),
                    None => result.push(Failure::new(
                        FailureKind::Structure,
                        child_path,
                        ShapeClass::of(child).to_string(),
                        "missing",
                    )),
                }
            }
        }
        (Value::Array(template), Value::Array(actual)) => {
            if let Some(first) = template.first() {
                for (index, item) in actual.iter().enumerate() {
                    check_shape(first, item, &format!("{path}[{index}]"), result);
                }
            }
        }
        _ => {}
    }
}

/// Renders a value compactly for failure messages.
fn render(value: &Value) -> String {
    value.to_string()
}
