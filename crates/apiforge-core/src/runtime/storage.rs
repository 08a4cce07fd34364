// crates/apiforge-core/src/runtime/storage.rs
// ============================================================================
// Module: apiforge Storage Validation
// Description: Build, execute, and assert storage lookups for generated cases.
// Purpose: Verify persistent side effects of an API call.
// Dependencies: crate::{core, interfaces}, bigdecimal, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`StorageRule`] becomes a parameterized lookup: either its literal
//! `query` with the resolved `where` values bound in order, or a generated
//! `SELECT` over `table` with one condition per `where` column (`IS NULL`
//! for null values). Identifiers are validated before they reach SQL and
//! values are always bound, never interpolated.
//!
//! A pooled connection is checked out for the duration of one lookup and
//! returned when its guard drops, on every exit path. Connection and query
//! faults are [`StorageError`]s, logged with the SQL and bound parameters and
//! never retried. Count and column mismatches are [`Failure`]s.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::CompareSource;
use crate::core::FieldPath;
use crate::core::StorageRule;
use crate::core::StorageTarget;
use crate::core::strict_equals;
use crate::core::value::decimal_from_number;
use crate::interfaces::EventSink;
use crate::interfaces::PlaceholderStyle;
use crate::interfaces::Row;
use crate::interfaces::StorageConnector;
use crate::interfaces::StorageError;
use crate::interfaces::StorageEvent;
use crate::runtime::response::Failure;
use crate::runtime::response::FailureKind;
use crate::runtime::response::ValidationResult;
use crate::runtime::template::ContextName;
use crate::runtime::template::TemplateContexts;
use crate::runtime::template::TemplateError;
use crate::runtime::template::resolve_value;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage validation errors (distinct from assertion failures).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageValidationError {
    /// A `where` or `expectedData` template did not resolve.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// The store could not be reached or the query failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ============================================================================
// SECTION: Query Building
// ============================================================================

/// Parameterized storage lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageQuery {
    /// SQL text with positional placeholders.
    pub sql: String,
    /// Bound parameters in placeholder order.
    pub params: Vec<Value>,
}

impl StorageQuery {
    /// Builds a lookup from a rule and its already-resolved `where` values.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidLookup`] when the rule has no single
    /// target or names an invalid identifier.
    pub fn build(
        rule: &StorageRule,
        where_values: &Map<String, Value>,
        style: PlaceholderStyle,
    ) -> Result<Self, StorageError> {
        match rule.target() {
            Some(StorageTarget::Query(query)) => Ok(Self {
                sql: query.to_string(),
                params: where_values.values().cloned().collect(),
            }),
            Some(StorageTarget::Table(table)) => {
                Self::select(table, &rule.fields, where_values, style)
            }
            None => Err(StorageError::InvalidLookup(
                "exactly one of table or query is required".to_string(),
            )),
        }
    }

    /// Builds `SELECT <fields|*> FROM <table> [WHERE ...]`.
    fn select(
        table: &str,
        fields: &[String],
        where_values: &Map<String, Value>,
        style: PlaceholderStyle,
    ) -> Result<Self, StorageError> {
        ensure_identifier(table)?;
        let columns = if fields.is_empty() {
            "*".to_string()
        } else {
            for field in fields {
                ensure_identifier(field)?;
            }
            fields.join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut params = Vec::new();
        let mut conditions = Vec::with_capacity(where_values.len());
        for (column, value) in where_values {
            ensure_identifier(column)?;
            if value.is_null() {
                conditions.push(format!("{column} IS NULL"));
            } else {
                params.push(value.clone());
                conditions.push(format!("{column} = {}", style.render(params.len())));
            }
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        Ok(Self {
            sql,
            params,
        })
    }
}

/// Rejects identifiers outside `[A-Za-z_][A-Za-z0-9_]*` (dot-separated).
fn ensure_identifier(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            part.starts_with(|ch: char| ch.is_ascii_alphabetic() || ch == '_')
                && part.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidLookup(format!("invalid identifier `{name}`")))
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Executes storage rules against a pooled connector.
pub struct StorageValidator<'a> {
    /// Pooled storage connector.
    connector: &'a dyn StorageConnector,
    /// Event sink for query logs.
    sink: &'a dyn EventSink,
}

impl<'a> StorageValidator<'a> {
    /// Creates a validator over a connector and event sink.
    #[must_use]
    pub fn new(connector: &'a dyn StorageConnector, sink: &'a dyn EventSink) -> Self {
        Self {
            connector,
            sink,
        }
    }

    /// Resolves, executes, and asserts a storage rule.
    ///
    /// # Errors
    ///
    /// Returns [`StorageValidationError`] when a template does not resolve or
    /// the lookup cannot be executed.
    pub fn validate(
        &self,
        rule: &StorageRule,
        contexts: &TemplateContexts,
    ) -> Result<ValidationResult, StorageValidationError> {
        let mut contexts = contexts.clone();
        if let Some(custom) = &rule.custom_data {
            contexts.custom_data = Some(custom.clone());
        }

        let mut where_values = Map::with_capacity(rule.where_clause.len());
        for (column, value) in &rule.where_clause {
            where_values.insert(column.clone(), resolve_value(value, &contexts)?);
        }
        let query = StorageQuery::build(rule, &where_values, self.connector.placeholder_style())?;
        let rows = self.fetch(&query)?;

        let mut result = ValidationResult::default();
        if let Some(expected) = rule.expected_count {
            let actual = u64::try_from(rows.len()).unwrap_or(u64::MAX);
            if actual != expected {
                result.push(Failure::new(
                    FailureKind::RowCount,
                    "rows",
                    expected.to_string(),
                    actual.to_string(),
                ));
            }
        }
        if rule.expected_data.is_empty() {
            return Ok(result);
        }
        let Some(row) = rows.first() else {
            result.push(Failure::new(FailureKind::NoRows, "rows", "at least one row", "0"));
            return Ok(result);
        };
        for (column, authored) in &rule.expected_data {
            let expected = match rule.compare_with {
                Some(source) => source_value(source, authored, &contexts)?,
                None => resolve_value(authored, &contexts)?,
            };
            match row.get(column) {
                Some(actual) if storage_equals(&expected, actual) => {}
                Some(actual) => result.push(Failure::new(
                    FailureKind::Column,
                    column.as_str(),
                    expected.to_string(),
                    actual.to_string(),
                )),
                None => result.push(Failure::new(
                    FailureKind::Column,
                    column.as_str(),
                    expected.to_string(),
                    "missing column",
                )),
            }
        }
        Ok(result)
    }

    /// Executes a lookup on a pooled connection and logs the outcome.
    fn fetch(&self, query: &StorageQuery) -> Result<Vec<Row>, StorageError> {
        let outcome = self
            .connector
            .acquire()
            .and_then(|mut connection| connection.query(&query.sql, &query.params));
        match &outcome {
            Ok(rows) => {
                let event = StorageEvent::query(&query.sql, &query.params, rows.len());
                self.sink.record_storage(&event);
            }
            Err(err) => {
                self.sink.record_storage(&StorageEvent::error(
                    &query.sql,
                    &query.params,
                    &err.to_string(),
                ));
            }
        }
        outcome
    }
}

/// Looks up a named field in the `compareWith` source context.
fn source_value(
    source: CompareSource,
    name: &Value,
    contexts: &TemplateContexts,
) -> Result<Value, TemplateError> {
    let context = match source {
        CompareSource::RequestData => ContextName::RequestData,
        CompareSource::ResponseData => ContextName::ResponseData,
        CompareSource::CustomData => ContextName::CustomData,
    };
    let name = name.as_str().unwrap_or_default();
    let expression = format!("{}.{name}", context.as_str());
    let Some(data) = contexts.get(context) else {
        return Err(TemplateError::MissingContext {
            expression,
            context: context.as_str().to_string(),
        });
    };
    let path = FieldPath::parse(name);
    path.lookup(data).cloned().ok_or_else(|| TemplateError::MissingPath {
        expression,
        context: context.as_str().to_string(),
        path: name.to_string(),
    })
}

/// Compares an expected value with a stored column value.
///
/// Beyond strict equality, a boolean matches `0`/`1` and a number matches
/// its decimal string form.
#[must_use]
pub fn storage_equals(expected: &Value, actual: &Value) -> bool {
    if strict_equals(expected, actual) {
        return true;
    }
    match (expected, actual) {
        (Value::Bool(flag), Value::Number(number)) | (Value::Number(number), Value::Bool(flag)) => {
            number.as_i64() == Some(i64::from(*flag))
        }
        (Value::Number(number), Value::String(text))
        | (Value::String(text), Value::Number(number)) => {
            match (decimal_from_number(number), BigDecimal::from_str(text.trim())) {
                (Some(left), Ok(right)) => left == right,
                _ => false,
            }
        }
        _ => false,
    }
}
