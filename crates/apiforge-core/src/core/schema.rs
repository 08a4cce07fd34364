// crates/apiforge-core/src/core/schema.rs
// ============================================================================
// Module: apiforge Schema Model
// Description: Declarative API test definitions and static validation.
// Purpose: Parse authored definitions and report every authoring mistake at once.
// Dependencies: serde, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! An [`ApiDefinition`] describes one API surface: a base route and the test
//! cases exercised against it. Definitions are parsed from JSON or YAML and
//! validated statically before any case is expanded or emitted.
//!
//! Validation never fails fast: every violation in a definition is collected
//! so authors see the full list in one pass. [`load_definitions`] keeps valid
//! definitions usable when siblings are rejected; [`parse_definitions`] is the
//! all-or-nothing form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Component;
use std::path::Path;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::value::DataType;
use crate::core::value::value_kind;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum definition file size accepted by [`read_definitions`].
pub const MAX_DEFINITION_BYTES: u64 = 4 * 1024 * 1024;

// ============================================================================
// SECTION: API Definition
// ============================================================================

/// One logical API surface: a base route plus its test cases.
///
/// # Invariants
/// - After validation, `page_name` and `base_route` are non-empty.
/// - After validation, `page_name` is usable as a file name and `folder`
///   is a relative path without `.` or `..` segments.
/// - After validation, `cases` is non-empty and method names are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiDefinition {
    /// Unique definition name.
    #[serde(default)]
    pub page_name: String,
    /// Optional output folder for emitted artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Base route for every case in this definition.
    #[serde(default)]
    pub base_route: String,
    /// Authored test cases.
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

impl ApiDefinition {
    /// Returns the artifact directory (`folder` when set, else `page_name`).
    #[must_use]
    pub fn output_dir(&self) -> &str {
        match self.folder.as_deref() {
            Some(folder) if !folder.trim().is_empty() => folder,
            _ => &self.page_name,
        }
    }

    /// Validates this definition and returns every violation found.
    #[must_use]
    pub fn violations(&self, index: usize) -> Vec<SchemaViolation> {
        let mut report = ViolationCollector::new(index, &self.page_name);
        self.collect_header_violations(Some(self.cases.len()), &mut report);
        let mut seen = BTreeSet::new();
        for (case_index, case) in self.cases.iter().enumerate() {
            let prefix = format!("cases[{case_index}]");
            check_method_name(&case.method_name, &prefix, &mut seen, &mut report);
            case.collect_violations(&prefix, &mut report);
        }
        report.finish()
    }

    /// Collects violations for everything except the cases themselves.
    ///
    /// `case_count` is `None` when the cases could not be read as a list.
    fn collect_header_violations(
        &self,
        case_count: Option<usize>,
        report: &mut ViolationCollector,
    ) {
        let page = self.page_name.as_str();
        if page.trim().is_empty() {
            report.push("pageName", "must be present and non-empty");
        } else if page.contains(['/', '\\']) || page == "." || page == ".." {
            report.push("pageName", format!("`{page}` cannot be used as a file name"));
        }
        if let Some(folder) = self.folder.as_deref()
            && !folder.trim().is_empty()
            && !Path::new(folder)
                .components()
                .all(|component| matches!(component, Component::Normal(_)))
        {
            report.push("folder", format!("`{folder}` must be a relative path without `..`"));
        }
        if self.base_route.trim().is_empty() {
            report.push("baseRoute", "must be present and non-empty");
        }
        if case_count == Some(0) {
            report.push("cases", "must contain at least one case");
        }
    }
}

// ============================================================================
// SECTION: Test Cases
// ============================================================================

/// HTTP method used by a test case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET.
    Get,
    /// HTTP POST (default).
    #[default]
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
    /// HTTP PATCH.
    Patch,
}

impl HttpMethod {
    /// Returns the uppercase method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authored test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestCase {
    /// Method name, unique within the definition.
    #[serde(default)]
    pub method_name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// HTTP method (defaults to POST).
    #[serde(default)]
    pub method: HttpMethod,
    /// Request body template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Path/query parameter template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    /// Expected HTTP status (required).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_status: Option<u16>,
    /// Case tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Body fields exercised by derived missing-field cases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<RequiredEntry>,
    /// Parameters exercised by derived missing-param cases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_params: Vec<RequiredEntry>,
    /// Explicit validation variants.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationCase>,
    /// Expected response assertion.
    #[serde(default, skip_serializing_if = "ExpectedResponse::is_unchecked")]
    pub expected_response: ExpectedResponse,
    /// Expected storage side effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_validation: Option<StorageRule>,
}

impl TestCase {
    /// Collects violations for this case under the given field prefix.
    fn collect_violations(&self, prefix: &str, report: &mut ViolationCollector) {
        check_expected_status(self.expect_status, &format!("{prefix}.expectStatus"), report);
        check_required(
            &self.required_fields,
            self.data.as_ref(),
            &format!("{prefix}.requiredFields"),
            "data",
            report,
        );
        check_required(
            &self.required_params,
            self.params.as_ref(),
            &format!("{prefix}.requiredParams"),
            "params",
            report,
        );
        if let ExpectedResponse::Rule(rule) = &self.expected_response {
            rule.collect_violations(&format!("{prefix}.expectedResponse"), report);
        }
        if let Some(storage) = &self.database_validation {
            storage.collect_violations(&format!("{prefix}.databaseValidation"), report);
        }
        for (index, validation) in self.validations.iter().enumerate() {
            validation.collect_violations(&format!("{prefix}.validations[{index}]"), report);
        }
    }
}

/// Required field or parameter entry.
///
/// Authored either as a plain name or as `{ name, expectStatus?, messageKey? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRequiredEntry", into = "RawRequiredEntry")]
pub struct RequiredEntry {
    /// Field or parameter name.
    pub name: String,
    /// Status expected when the field is missing.
    pub expect_status: Option<u16>,
    /// Message key expected when the field is missing.
    pub message_key: Option<String>,
}

impl RequiredEntry {
    /// Creates a plain required entry without negative-path expectations.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expect_status: None,
            message_key: None,
        }
    }
}

/// Wire form of [`RequiredEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawRequiredEntry {
    /// Plain field name.
    Name(String),
    /// Record form with negative-path expectations.
    Record {
        /// Field or parameter name.
        name: String,
        /// Status expected when the field is missing.
        #[serde(rename = "expectStatus", default, skip_serializing_if = "Option::is_none")]
        expect_status: Option<u16>,
        /// Message key expected when the field is missing.
        #[serde(rename = "messageKey", default, skip_serializing_if = "Option::is_none")]
        message_key: Option<String>,
    },
}

impl From<RawRequiredEntry> for RequiredEntry {
    fn from(raw: RawRequiredEntry) -> Self {
        match raw {
            RawRequiredEntry::Name(name) => Self::named(name),
            RawRequiredEntry::Record {
                name,
                expect_status,
                message_key,
            } => Self {
                name,
                expect_status,
                message_key,
            },
        }
    }
}

impl From<RequiredEntry> for RawRequiredEntry {
    fn from(entry: RequiredEntry) -> Self {
        if entry.expect_status.is_none() && entry.message_key.is_none() {
            Self::Name(entry.name)
        } else {
            Self::Record {
                name: entry.name,
                expect_status: entry.expect_status,
                message_key: entry.message_key,
            }
        }
    }
}

/// Explicit validation variant of a test case.
///
/// Unset fields inherit from the parent case during expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidationCase {
    /// Description override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Request body override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Parameter override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    /// Expected status (required).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_status: Option<u16>,
    /// Additional tags (unioned with the parent's).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Expected response override.
    #[serde(default, skip_serializing_if = "ExpectedResponse::is_unchecked")]
    pub expected_response: ExpectedResponse,
    /// Storage rule override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_validation: Option<StorageRule>,
    /// Expected message key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_key: Option<String>,
}

impl ValidationCase {
    /// Collects violations for this validation entry.
    fn collect_violations(&self, prefix: &str, report: &mut ViolationCollector) {
        check_expected_status(self.expect_status, &format!("{prefix}.expectStatus"), report);
        if let ExpectedResponse::Rule(rule) = &self.expected_response {
            rule.collect_violations(&format!("{prefix}.expectedResponse"), report);
        }
        if let Some(storage) = &self.database_validation {
            storage.collect_violations(&format!("{prefix}.databaseValidation"), report);
        }
    }
}

// ============================================================================
// SECTION: Response Rules
// ============================================================================

/// Expected response assertion.
///
/// # Invariants
/// - `Unchecked` is the absent field; `Empty` is an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ExpectedResponse {
    /// No body assertion.
    #[default]
    Unchecked,
    /// The body must be empty.
    Empty,
    /// The body must satisfy the rule.
    Rule(ResponseRule),
}

impl ExpectedResponse {
    /// Returns true when no body assertion is configured.
    #[must_use]
    pub const fn is_unchecked(&self) -> bool {
        matches!(self, Self::Unchecked)
    }
}

impl Serialize for ExpectedResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unchecked | Self::Empty => serializer.serialize_none(),
            Self::Rule(rule) => rule.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ExpectedResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rule = Option::<ResponseRule>::deserialize(deserializer)?;
        Ok(rule.map_or(Self::Empty, Self::Rule))
    }
}

/// Declarative response rule set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseRule {
    /// Shape template; only shape classes are compared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Value>,
    /// Paths that must exist (value may be null).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_keys: Vec<String>,
    /// Declared runtime types by path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_types: BTreeMap<String, DataType>,
    /// Expected literal values by path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Value>,
    /// Array length and item checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_validation: Option<ArrayValidation>,
}

impl ResponseRule {
    /// Collects violations for this rule.
    fn collect_violations(&self, prefix: &str, report: &mut ViolationCollector) {
        if let Some(array) = &self.array_validation
            && let (Some(min), Some(max)) = (array.min_length, array.max_length)
            && min > max
        {
            report.push(
                format!("{prefix}.arrayValidation"),
                format!("minLength {min} exceeds maxLength {max}"),
            );
        }
    }
}

/// Array length and item structure checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArrayValidation {
    /// Path to the array (defaults to the body itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Inclusive minimum length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Inclusive maximum length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Shape template applied to every element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_structure: Option<Value>,
}

// ============================================================================
// SECTION: Storage Rules
// ============================================================================

/// Source context used to interpret `expectedData` values as field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareSource {
    /// Request body.
    RequestData,
    /// Parsed response body.
    ResponseData,
    /// The rule's `customData`.
    CustomData,
}

/// Declarative storage side-effect assertion.
///
/// # Invariants
/// - After validation, exactly one of `table` or `query` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StorageRule {
    /// Table to select from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Literal query with positional parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Lookup conditions (values may be template expressions).
    #[serde(rename = "where", default)]
    pub where_clause: Map<String, Value>,
    /// Selected columns (default all).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Expected row count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_count: Option<u64>,
    /// Expected column values on the first row.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub expected_data: Map<String, Value>,
    /// Source context for name-based comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_with: Option<CompareSource>,
    /// Custom comparison data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
}

/// Lookup target of a storage rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTarget<'a> {
    /// Generated select over a table.
    Table(&'a str),
    /// Literal query.
    Query(&'a str),
}

impl StorageRule {
    /// Returns the lookup target when exactly one of `table`/`query` is set.
    #[must_use]
    pub fn target(&self) -> Option<StorageTarget<'_>> {
        match (self.table.as_deref(), self.query.as_deref()) {
            (Some(table), None) => Some(StorageTarget::Table(table)),
            (None, Some(query)) => Some(StorageTarget::Query(query)),
            _ => None,
        }
    }

    /// Collects violations for this rule.
    fn collect_violations(&self, prefix: &str, report: &mut ViolationCollector) {
        match (&self.table, &self.query) {
            (Some(_), Some(_)) => {
                report.push(prefix.to_string(), "table and query are mutually exclusive");
            }
            (None, None) => report.push(prefix.to_string(), "one of table or query is required"),
            (None, Some(_)) if !self.fields.is_empty() => {
                report.push(format!("{prefix}.fields"), "fields only apply to table lookups");
            }
            _ => {}
        }
        if let Some(source) = self.compare_with {
            if source == CompareSource::CustomData && self.custom_data.is_none() {
                report.push(
                    format!("{prefix}.customData"),
                    "is required when compareWith is customData",
                );
            }
            for (column, value) in &self.expected_data {
                if !value.is_string() {
                    report.push(
                        format!("{prefix}.expectedData.{column}"),
                        "must name a source field when compareWith is set",
                    );
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// One authoring mistake located by definition index and field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// Index of the definition in the input sequence.
    pub definition_index: usize,
    /// Definition name when known.
    pub page_name: Option<String>,
    /// Offending field path.
    pub field: String,
    /// Violation description.
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "definition[{}]", self.definition_index)?;
        if let Some(name) = &self.page_name {
            write!(f, " ({name})")?;
        }
        write!(f, " {}: {}", self.field, self.message)
    }
}

/// Schema loading and validation errors.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// Input could not be read or is not a definition sequence.
    #[error("schema input error: {0}")]
    Input(String),
    /// One or more definitions failed validation.
    #[error("schema validation failed: {}", render_violations(.0))]
    Invalid(Vec<SchemaViolation>),
}

impl SchemaError {
    /// Returns the collected violations (empty for input errors).
    #[must_use]
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            Self::Input(_) => &[],
            Self::Invalid(violations) => violations,
        }
    }
}

/// Renders violations as a consolidated listing.
fn render_violations(violations: &[SchemaViolation]) -> String {
    let mut out = format!("{} violation(s)", violations.len());
    for violation in violations {
        out.push_str("\n  - ");
        out.push_str(&violation.to_string());
    }
    out
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Definition rejected during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedDefinition {
    /// Index of the definition in the input sequence.
    pub index: usize,
    /// Definition name when known.
    pub page_name: Option<String>,
    /// Every violation found for the definition.
    pub violations: Vec<SchemaViolation>,
}

/// Outcome of a partial load: valid definitions plus rejected ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionLoad {
    /// Definitions that passed validation, in input order.
    pub definitions: Vec<ApiDefinition>,
    /// Input index of each entry in `definitions`.
    pub indices: Vec<usize>,
    /// Definitions that failed validation, in input order.
    pub rejected: Vec<RejectedDefinition>,
}

impl DefinitionLoad {
    /// Converts the load into an all-or-nothing result.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] listing every violation when any
    /// definition was rejected.
    pub fn into_result(self) -> Result<Vec<ApiDefinition>, SchemaError> {
        if self.rejected.is_empty() {
            return Ok(self.definitions);
        }
        Err(SchemaError::Invalid(
            self.rejected.into_iter().flat_map(|rejected| rejected.violations).collect(),
        ))
    }
}

/// Loads definitions, separating valid ones from rejected ones.
///
/// Accepts a JSON array of definitions or a single definition object. Each
/// case decodes on its own, so a malformed case is reported beside every
/// other violation of its definition.
///
/// # Errors
///
/// Returns [`SchemaError::Input`] when the input is neither an array nor an object.
pub fn load_definitions(raw: &Value) -> Result<DefinitionLoad, SchemaError> {
    let entries: Vec<&Value> = match raw {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![raw],
        other => {
            return Err(SchemaError::Input(format!(
                "expected an array of definitions, found {}",
                value_kind(other)
            )));
        }
    };
    let mut load = DefinitionLoad::default();
    let mut page_names = BTreeSet::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let declared_name = entry
            .get("pageName")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string);
        let (definition, mut violations) = decode_definition(index, entry);
        if let Some(name) = &declared_name
            && !page_names.insert(name.clone())
        {
            violations.push(SchemaViolation {
                definition_index: index,
                page_name: Some(name.clone()),
                field: "pageName".to_string(),
                message: format!("duplicate page name `{name}`"),
            });
        }
        match definition {
            Some(definition) if violations.is_empty() => {
                load.definitions.push(definition);
                load.indices.push(index);
            }
            _ => load.rejected.push(RejectedDefinition {
                index,
                page_name: declared_name,
                violations,
            }),
        }
    }
    Ok(load)
}

/// Decodes one definition entry, collecting every violation.
///
/// The definition is returned only when the header and every case decoded.
fn decode_definition(
    index: usize,
    entry: &Value,
) -> (Option<ApiDefinition>, Vec<SchemaViolation>) {
    let raw_name = entry.get("pageName").and_then(Value::as_str).unwrap_or_default();
    let mut report = ViolationCollector::new(index, raw_name);
    let Value::Object(fields) = entry else {
        report.push("<definition>", format!("expected an object, found {}", value_kind(entry)));
        return (None, report.finish());
    };

    let mut header_fields = fields.clone();
    let raw_cases = header_fields.remove("cases");
    let header = match serde_json::from_value::<ApiDefinition>(Value::Object(header_fields)) {
        Ok(header) => Some(header),
        Err(err) => {
            report.push("<definition>", err.to_string());
            None
        }
    };
    let raw_cases = match raw_cases {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => Some(items),
        Some(other) => {
            report.push("cases", format!("expected an array, found {}", value_kind(&other)));
            None
        }
    };
    let shown = header.clone().unwrap_or_else(|| ApiDefinition {
        page_name: raw_name.to_string(),
        folder: fields.get("folder").and_then(Value::as_str).map(str::to_string),
        base_route: fields
            .get("baseRoute")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        cases: Vec::new(),
    });
    shown.collect_header_violations(raw_cases.as_ref().map(Vec::len), &mut report);

    let mut decoded_all = header.is_some() && raw_cases.is_some();
    let mut cases = Vec::new();
    let mut seen = BTreeSet::new();
    for (case_index, raw_case) in raw_cases.into_iter().flatten().enumerate() {
        let prefix = format!("cases[{case_index}]");
        let method_name = raw_case.get("methodName").and_then(Value::as_str).unwrap_or_default();
        check_method_name(method_name, &prefix, &mut seen, &mut report);
        match serde_json::from_value::<TestCase>(raw_case) {
            Ok(case) => {
                case.collect_violations(&prefix, &mut report);
                cases.push(case);
            }
            Err(err) => {
                report.push(prefix, err.to_string());
                decoded_all = false;
            }
        }
    }

    let definition = header.filter(|_| decoded_all).map(|header| ApiDefinition {
        cases,
        ..header
    });
    (definition, report.finish())
}

/// Parses and validates definitions, failing on any violation.
///
/// # Errors
///
/// Returns [`SchemaError`] listing every violation across all definitions.
pub fn parse_definitions(raw: &Value) -> Result<Vec<ApiDefinition>, SchemaError> {
    load_definitions(raw)?.into_result()
}

/// Reads a definition file (JSON, or YAML for `.yaml`/`.yml`) into a raw value.
///
/// # Errors
///
/// Returns [`SchemaError::Input`] when the file cannot be read, exceeds
/// [`MAX_DEFINITION_BYTES`], or fails to parse.
pub fn read_definitions(path: &Path) -> Result<Value, SchemaError> {
    let file = fs::File::open(path)
        .map_err(|err| SchemaError::Input(format!("{}: {err}", path.display())))?;
    let mut bytes = Vec::new();
    file.take(MAX_DEFINITION_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| SchemaError::Input(format!("{}: {err}", path.display())))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_DEFINITION_BYTES {
        return Err(SchemaError::Input(format!(
            "{} exceeds {MAX_DEFINITION_BYTES} bytes",
            path.display()
        )));
    }
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_slice(&bytes)
            .map_err(|err| SchemaError::Input(format!("{}: {err}", path.display())))
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|err| SchemaError::Input(format!("{}: {err}", path.display())))
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Accumulates violations for a single definition.
struct ViolationCollector {
    /// Definition index.
    index: usize,
    /// Definition name when non-empty.
    page_name: Option<String>,
    /// Collected violations.
    violations: Vec<SchemaViolation>,
}

impl ViolationCollector {
    /// Creates a collector for the definition at `index`.
    fn new(index: usize, page_name: &str) -> Self {
        let page_name =
            if page_name.trim().is_empty() { None } else { Some(page_name.to_string()) };
        Self {
            index,
            page_name,
            violations: Vec::new(),
        }
    }

    /// Records a violation.
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(SchemaViolation {
            definition_index: self.index,
            page_name: self.page_name.clone(),
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns the collected violations.
    fn finish(self) -> Vec<SchemaViolation> {
        self.violations
    }
}

/// Ensures a required status is present and a valid HTTP status.
fn check_expected_status(status: Option<u16>, field: &str, report: &mut ViolationCollector) {
    match status {
        Some(status) => check_status(status, field, report),
        None => report.push(field.to_string(), "is required"),
    }
}

/// Ensures a method name is present and unique within its definition.
fn check_method_name(
    method_name: &str,
    prefix: &str,
    seen: &mut BTreeSet<String>,
    report: &mut ViolationCollector,
) {
    if method_name.trim().is_empty() {
        report.push(format!("{prefix}.methodName"), "must be present and non-empty");
    } else if !seen.insert(method_name.to_string()) {
        report.push(
            format!("{prefix}.methodName"),
            format!("duplicate method name `{method_name}`"),
        );
    }
}

/// Ensures a status code is a valid HTTP status.
fn check_status(status: u16, field: &str, report: &mut ViolationCollector) {
    if !(100 ..= 599).contains(&status) {
        report.push(field.to_string(), format!("{status} is not a valid HTTP status"));
    }
}

/// Ensures every required entry names a key of the template.
fn check_required(
    entries: &[RequiredEntry],
    template: Option<&Map<String, Value>>,
    field: &str,
    template_name: &str,
    report: &mut ViolationCollector,
) {
    for (index, entry) in entries.iter().enumerate() {
        let present = template.is_some_and(|map| map.contains_key(&entry.name));
        if !present {
            report.push(
                format!("{field}[{index}]"),
                format!("`{}` is not a key of {template_name}", entry.name),
            );
        }
        if let Some(status) = entry.expect_status {
            check_status(status, &format!("{field}[{index}].expectStatus"), report);
        }
    }
}
