// crates/apiforge-core/src/core/value.rs
// ============================================================================
// Module: apiforge Value Helpers
// Description: Shape classes, declared data types, and strict JSON equality.
// Purpose: Give the validation engines total, side-effect-free value checks.
// Dependencies: bigdecimal, serde, serde_json
// ============================================================================

//! ## Overview
//! JSON values are treated as tagged trees with three shape classes (object,
//! array, primitive). Equality is strict: no type coercion is applied, except
//! that numbers compare by decimal value so `1` equals `1.0`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Shape Classes
// ============================================================================

/// Shape class used by structure checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeClass {
    /// JSON object.
    Object,
    /// JSON array.
    Array,
    /// String, number, boolean, or null.
    Primitive,
}

impl ShapeClass {
    /// Returns the shape class of a JSON value.
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            _ => Self::Primitive,
        }
    }
}

impl fmt::Display for ShapeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Primitive => "primitive",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Declared Data Types
// ============================================================================

/// Type names accepted by `dataTypes` response rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// JSON string.
    String,
    /// JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON object or array.
    Object,
}

impl DataType {
    /// Returns true when the value's runtime type matches this declared type.
    #[must_use]
    pub const fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_))
                | (Self::Number, Value::Number(_))
                | (Self::Boolean, Value::Bool(_))
                | (Self::Object, Value::Object(_) | Value::Array(_))
        )
    }

    /// Returns the declared type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the runtime type label of a JSON value.
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Equality
// ============================================================================

/// Compares two JSON values strictly (no cross-type coercion).
///
/// Numbers compare by decimal value; arrays and objects compare element-wise.
#[must_use]
pub fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left.iter().zip(right.iter()).all(|(l, r)| strict_equals(l, r))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, l)| right.get(key).is_some_and(|r| strict_equals(l, r)))
        }
        _ => left == right,
    }
}

/// Compares two JSON numbers by decimal value.
fn numbers_equal(left: &Number, right: &Number) -> bool {
    match (decimal_from_number(left), decimal_from_number(right)) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

/// Converts a JSON number into a decimal.
pub(crate) fn decimal_from_number(number: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&number.to_string()).ok()
}

/// Returns true when a response body counts as empty.
///
/// Absent bodies, JSON `null`, and blank strings are empty.
#[must_use]
pub fn is_empty_body(body: Option<&Value>) -> bool {
    match body {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}
