// crates/apiforge-core/src/runtime/template.rs
// ============================================================================
// Module: apiforge Template Resolver
// Description: Resolve `{{context.path}}` placeholders against runtime contexts.
// Purpose: Let storage rules reference request, response, and parameter data.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Template expressions look like `{{responseData.user.id}}`. The first
//! segment names a context (`requestData`, `responseData`, `params`,
//! `customData`); the remainder is a [`FieldPath`] into it. A string that is
//! exactly one placeholder resolves to the referenced native value. Mixed
//! text substitutes textually: strings are inserted raw, every other value as
//! compact JSON. Resolution holds no state and fails closed: a missing
//! context or path is an error, never an empty substitution.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::core::FieldPath;

// ============================================================================
// SECTION: Contexts
// ============================================================================

/// Named context a placeholder can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextName {
    /// Request body sent by the case.
    RequestData,
    /// Parsed response body.
    ResponseData,
    /// Request parameters.
    Params,
    /// Storage rule custom data.
    CustomData,
}

impl ContextName {
    /// Parses a context name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "requestData" => Some(Self::RequestData),
            "responseData" => Some(Self::ResponseData),
            "params" => Some(Self::Params),
            "customData" => Some(Self::CustomData),
            _ => None,
        }
    }

    /// Returns the context name as written in templates.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestData => "requestData",
            Self::ResponseData => "responseData",
            Self::Params => "params",
            Self::CustomData => "customData",
        }
    }
}

impl fmt::Display for ContextName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime contexts available to one resolution call.
///
/// # Invariants
/// - An absent context is distinct from a present `null` context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContexts {
    /// Request body.
    pub request_data: Option<Value>,
    /// Parsed response body.
    pub response_data: Option<Value>,
    /// Request parameters.
    pub params: Option<Value>,
    /// Storage rule custom data.
    pub custom_data: Option<Value>,
}

impl TemplateContexts {
    /// Creates an empty context set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request body context.
    #[must_use]
    pub fn with_request_data(mut self, value: Value) -> Self {
        self.request_data = Some(value);
        self
    }

    /// Sets the response body context.
    #[must_use]
    pub fn with_response_data(mut self, value: Value) -> Self {
        self.response_data = Some(value);
        self
    }

    /// Sets the parameter context.
    #[must_use]
    pub fn with_params(mut self, value: Value) -> Self {
        self.params = Some(value);
        self
    }

    /// Sets the custom data context.
    #[must_use]
    pub fn with_custom_data(mut self, value: Value) -> Self {
        self.custom_data = Some(value);
        self
    }

    /// Returns the named context when present.
    #[must_use]
    pub fn get(&self, name: ContextName) -> Option<&Value> {
        match name {
            ContextName::RequestData => self.request_data.as_ref(),
            ContextName::ResponseData => self.response_data.as_ref(),
            ContextName::Params => self.params.as_ref(),
            ContextName::CustomData => self.custom_data.as_ref(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Template resolution failure. Fails only the current test.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// Context exists by name but was not supplied for this call.
    #[error("unresolved template `{expression}`: context `{context}` is not available")]
    MissingContext {
        /// Full placeholder expression.
        expression: String,
        /// Context searched.
        context: String,
    },
    /// Context name is not recognized.
    #[error("unresolved template `{expression}`: unknown context `{context}`")]
    UnknownContext {
        /// Full placeholder expression.
        expression: String,
        /// Context name as written.
        context: String,
    },
    /// Path does not resolve inside the context.
    #[error("unresolved template `{expression}`: path `{path}` not found in `{context}`")]
    MissingPath {
        /// Full placeholder expression.
        expression: String,
        /// Context searched.
        context: String,
        /// Path that failed to resolve.
        path: String,
    },
}

/// Alias naming the resolution failure by what it reports.
pub type UnresolvedTemplateError = TemplateError;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Placeholder located inside a template string.
struct Placeholder<'a> {
    /// Byte offset of `{{`.
    start: usize,
    /// Byte offset just past `}}`.
    end: usize,
    /// Trimmed text between the braces.
    inner: &'a str,
}

/// Finds the next complete placeholder at or after `from`.
fn next_placeholder(text: &str, from: usize) -> Option<Placeholder<'_>> {
    let open = text[from ..].find("{{")? + from;
    let close = text[open + 2 ..].find("}}")? + open + 2;
    Some(Placeholder {
        start: open,
        end: close + 2,
        inner: text[open + 2 .. close].trim(),
    })
}

/// Returns true when the text contains at least one placeholder.
#[must_use]
pub fn contains_template(text: &str) -> bool {
    next_placeholder(text, 0).is_some()
}

/// Resolves a single placeholder body such as `responseData.user.id`.
fn lookup(inner: &str, contexts: &TemplateContexts) -> Result<Value, TemplateError> {
    let expression = format!("{{{{{inner}}}}}");
    let (context_name, path) = inner.split_once('.').unwrap_or((inner, ""));
    let context_name = context_name.trim();
    let Some(name) = ContextName::parse(context_name) else {
        return Err(TemplateError::UnknownContext {
            expression,
            context: context_name.to_string(),
        });
    };
    let Some(context) = contexts.get(name) else {
        return Err(TemplateError::MissingContext {
            expression,
            context: name.as_str().to_string(),
        });
    };
    let path = FieldPath::parse(path);
    path.lookup(context).cloned().ok_or_else(|| TemplateError::MissingPath {
        expression,
        context: name.as_str().to_string(),
        path: path.as_str().to_string(),
    })
}

/// Resolves template placeholders inside a string.
///
/// # Errors
///
/// Returns [`TemplateError`] when a context is unknown or absent, or a path
/// does not resolve.
pub fn resolve(text: &str, contexts: &TemplateContexts) -> Result<Value, TemplateError> {
    let Some(first) = next_placeholder(text, 0) else {
        return Ok(Value::String(text.to_string()));
    };
    if first.start == 0 && first.end == text.len() {
        return lookup(first.inner, contexts);
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut current = Some(first);
    while let Some(placeholder) = current {
        out.push_str(&text[cursor .. placeholder.start]);
        match lookup(placeholder.inner, contexts)? {
            Value::String(value) => out.push_str(&value),
            other => out.push_str(&other.to_string()),
        }
        cursor = placeholder.end;
        current = next_placeholder(text, cursor);
    }
    out.push_str(&text[cursor ..]);
    Ok(Value::String(out))
}

/// Resolves every string inside a JSON value recursively.
///
/// Object keys are never treated as templates.
///
/// # Errors
///
/// Returns the first [`TemplateError`] encountered.
pub fn resolve_value(value: &Value, contexts: &TemplateContexts) -> Result<Value, TemplateError> {
    match value {
        Value::String(text) => resolve(text, contexts),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, contexts))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_value(item, contexts)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}
