// crates/apiforge-core/src/core/path.rs
// ============================================================================
// Module: apiforge Field Paths
// Description: Dotted and JSONPath field selectors over JSON values.
// Purpose: Resolve rule and template paths against response and request data.
// Dependencies: jsonpath_lib, serde_json
// ============================================================================

//! ## Overview
//! A [`FieldPath`] selects one value inside a JSON tree. Dotted paths such as
//! `user.items.0.id` (or `user.items[0].id`) walk object keys and array
//! indices. Paths that start with `$` are treated as JSONPath selectors and
//! return the first match. Lookups are total: a missing segment yields `None`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Field Path
// ============================================================================

/// Parsed field selector.
///
/// # Invariants
/// - `segments` is empty for the root path and for JSONPath selectors.
/// - The raw text is preserved for error reporting and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath {
    /// Path text as authored.
    raw: String,
    /// Dotted segments (empty for JSONPath selectors).
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a field path. Parsing never fails; an empty path selects the root.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let segments = if raw.starts_with('$') { Vec::new() } else { split_segments(&raw) };
        Self {
            raw,
            segments,
        }
    }

    /// Returns the path text as authored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true when this path is a JSONPath selector.
    #[must_use]
    pub fn is_json_path(&self) -> bool {
        self.raw.starts_with('$')
    }

    /// Returns true when the path selects the root value.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the dotted segments of this path.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolves the path against a JSON value.
    #[must_use]
    pub fn lookup<'a>(&'a self, value: &'a Value) -> Option<&'a Value> {
        if self.is_json_path() {
            return jsonpath_lib::select(value, &self.raw).ok()?.into_iter().next();
        }
        let mut current = value;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl From<String> for FieldPath {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() { f.write_str("<root>") } else { f.write_str(&self.raw) }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits a dotted path into key and index segments.
fn split_segments(raw: &str) -> Vec<String> {
    let mut segments = Vec::new();
    for part in raw.split('.') {
        let mut rest = part;
        if let Some(open) = rest.find('[') {
            let head = &rest[.. open];
            if !head.is_empty() {
                segments.push(head.to_string());
            }
            rest = &rest[open ..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else {
                    segments.push(stripped.to_string());
                    break;
                };
                segments.push(stripped[.. close].to_string());
                rest = &stripped[close + 1 ..];
            }
        } else if !rest.is_empty() {
            segments.push(rest.to_string());
        }
    }
    segments
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use serde_json::json;

    use super::FieldPath;

    #[test]
    fn dotted_path_walks_objects_and_indices() {
        let value = json!({"user": {"items": [{"id": 1}, {"id": 2}]}});
        assert_eq!(FieldPath::parse("user.items.1.id").lookup(&value), Some(&json!(2)));
        assert_eq!(FieldPath::parse("user.items[0].id").lookup(&value), Some(&json!(1)));
    }

    #[test]
    fn missing_segment_yields_none() {
        let value = json!({"user": {"name": null}});
        assert_eq!(FieldPath::parse("user.name").lookup(&value), Some(&json!(null)));
        assert!(FieldPath::parse("user.email").lookup(&value).is_none());
        assert!(FieldPath::parse("user.name.first").lookup(&value).is_none());
    }

    #[test]
    fn empty_path_selects_root() {
        let value = json!([1, 2]);
        let path = FieldPath::parse("");
        assert!(path.is_root());
        assert_eq!(path.lookup(&value), Some(&value));
    }

    #[test]
    fn json_path_returns_first_match() {
        let value = json!({"items": [{"id": 7}, {"id": 8}]});
        let path = FieldPath::parse("$.items[*].id");
        assert!(path.is_json_path());
        assert_eq!(path.lookup(&value), Some(&json!(7)));
    }
}
