// crates/apiforge-codegen/src/document.rs
// ============================================================================
// Module: Artifact Document
// Description: Structured intermediate form of emitted artifacts.
// Purpose: Decide names, types, and ordering before any text is rendered.
// Dependencies: apiforge-core, serde_json
// ============================================================================

//! ## Overview
//! [`build_document`] turns a definition and its expanded matrix into an
//! [`ArtifactDocument`]. Every naming and typing decision happens here so the
//! renderer only formats text. Identifier collisions are resolved with
//! numeric suffixes in declaration order, which keeps output stable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use apiforge_core::ApiDefinition;
use apiforge_core::CaseVariant;
use apiforge_core::DataType;
use apiforge_core::ExpectedResponse;
use apiforge_core::GeneratedCase;
use apiforge_core::HttpMethod;
use apiforge_core::ResponseRule;
use apiforge_core::definition_digest;
use apiforge_core::core::case::pascal_case;
use apiforge_core::core::case::snake_case;
use serde_json::Map;
use serde_json::Value;

use crate::CodegenError;

// ============================================================================
// SECTION: Document Types
// ============================================================================

/// Everything needed to render one definition's artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactDocument {
    /// Definition name.
    pub page_name: String,
    /// Base route.
    pub base_route: String,
    /// Canonical definition digest (`sha256:<hex>`).
    pub digest: String,
    /// File name of the models artifact, included by the client.
    pub models_file: String,
    /// File name of the client artifact, included by the tests.
    pub client_file: String,
    /// Request and response models.
    pub models: Vec<ModelDecl>,
    /// Client declaration.
    pub client: ClientDecl,
    /// Tests in matrix order.
    pub tests: Vec<TestDecl>,
}

/// Model role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Request body.
    Request,
    /// Response body.
    Response,
}

/// One model struct.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDecl {
    /// Struct name.
    pub name: String,
    /// Model role.
    pub kind: ModelKind,
    /// Method the model belongs to.
    pub method_name: String,
    /// Declared fields.
    pub fields: Vec<FieldDecl>,
}

/// One model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Wire name.
    pub json_name: String,
    /// Rust identifier (raw identifiers included).
    pub rust_name: String,
    /// Field type.
    pub ty: FieldType,
    /// Wrapped in `Option`.
    pub optional: bool,
}

impl FieldDecl {
    /// Returns true when the wire name needs a serde rename.
    #[must_use]
    pub fn needs_rename(&self) -> bool {
        self.rust_name.trim_start_matches("r#") != self.json_name
    }
}

/// Rust type of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `String`.
    String,
    /// `i64`.
    Integer,
    /// `f64`.
    Float,
    /// `bool`.
    Bool,
    /// `Vec<Value>`.
    Array,
    /// `Value`.
    Any,
}

impl FieldType {
    /// Returns the Rust type text.
    #[must_use]
    pub const fn rust_type(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "i64",
            Self::Float => "f64",
            Self::Bool => "bool",
            Self::Array => "Vec<Value>",
            Self::Any => "Value",
        }
    }

    /// Infers a field type from a sample value.
    #[must_use]
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Number(number) if number.is_i64() => Self::Integer,
            Value::Number(_) => Self::Float,
            Value::Bool(_) => Self::Bool,
            Value::Array(_) => Self::Array,
            Value::Object(_) | Value::Null => Self::Any,
        }
    }

    /// Widens integers to floats for response fields.
    #[must_use]
    pub const fn widened(self) -> Self {
        match self {
            Self::Integer => Self::Float,
            other => other,
        }
    }

    /// Maps a declared response data type.
    #[must_use]
    pub const fn from_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::String => Self::String,
            DataType::Number => Self::Float,
            DataType::Boolean => Self::Bool,
            DataType::Object => Self::Any,
        }
    }
}

/// Client declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDecl {
    /// Struct name.
    pub name: String,
    /// One method per authored `methodName`.
    pub methods: Vec<ClientMethod>,
}

/// One client method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMethod {
    /// Rust function name.
    pub fn_name: String,
    /// Name of the variant taking the typed request model.
    pub typed_fn_name: String,
    /// Request model of the method's main case.
    pub request_model: String,
    /// Authored method name.
    pub method_name: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Authored description.
    pub description: String,
}

/// One generated test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDecl {
    /// Rust function name.
    pub fn_name: String,
    /// Camel-case test name.
    pub test_name: String,
    /// Client method issuing the call.
    pub client_fn: String,
    /// Variant label.
    pub variant: String,
    /// Case description.
    pub description: String,
    /// Embedded case JSON.
    pub case_json: String,
}

// ============================================================================
// SECTION: Building
// ============================================================================

/// Builds the artifact document for a definition and its matrix.
///
/// # Errors
///
/// Returns [`CodegenError`] when the digest cannot be computed or a case
/// cannot be serialized.
pub fn build_document(
    definition: &ApiDefinition,
    cases: &[GeneratedCase],
) -> Result<ArtifactDocument, CodegenError> {
    let digest = definition_digest(definition)
        .map_err(|err| CodegenError::Digest(err.to_string()))?
        .to_string();

    let mut type_names = UniqueNames::default();
    let client_name = type_names.claim(&format!("{}Client", pascal_case(&definition.page_name)));

    let mut models = Vec::new();
    let mut request_models = BTreeMap::new();
    for case in cases {
        if !matches!(case.variant, CaseVariant::Main | CaseVariant::ExplicitValidation(_)) {
            continue;
        }
        let authored = definition.cases.get(case.source.index);
        let optional: BTreeSet<&str> = match (&case.variant, authored) {
            (CaseVariant::Main, Some(authored)) => {
                authored.required_fields.iter().map(|entry| entry.name.as_str()).collect()
            }
            _ => BTreeSet::new(),
        };
        let base = case.model_name();
        let request_name = type_names.claim(&format!("{base}Request"));
        if case.variant == CaseVariant::Main {
            request_models.insert(case.source.index, request_name.clone());
        }
        models.push(ModelDecl {
            name: request_name,
            kind: ModelKind::Request,
            method_name: case.source.method_name.clone(),
            fields: request_fields(case.data.as_ref(), &optional),
        });
        models.push(ModelDecl {
            name: type_names.claim(&format!("{base}Response")),
            kind: ModelKind::Response,
            method_name: case.source.method_name.clone(),
            fields: response_fields(&case.expected_response),
        });
    }

    let mut fn_names = UniqueNames::default();
    fn_names.claim("new");
    let fn_bases: Vec<String> = definition
        .cases
        .iter()
        .map(|authored| fn_names.claim(&rust_ident(&snake_case(&authored.method_name))))
        .collect();
    let mut methods = Vec::with_capacity(definition.cases.len());
    for (index, (authored, fn_name)) in definition.cases.iter().zip(fn_bases).enumerate() {
        let request_model = request_models.remove(&index).ok_or_else(|| {
            CodegenError::Matrix(format!("method `{}` has no main case", authored.method_name))
        })?;
        let typed_fn_name = fn_names.claim(&format!("{}_with", fn_name.trim_start_matches("r#")));
        methods.push(ClientMethod {
            fn_name,
            typed_fn_name,
            request_model,
            method_name: authored.method_name.clone(),
            method: authored.method,
            description: authored.description.clone(),
        });
    }

    let mut test_names = UniqueNames::default();
    let mut tests = Vec::with_capacity(cases.len());
    for case in cases {
        let case_json = serde_json::to_string_pretty(case)
            .map_err(|err| CodegenError::Json(err.to_string()))?;
        let test_name = case.test_name();
        let client_fn = methods
            .get(case.source.index)
            .map(|method| method.fn_name.clone())
            .ok_or_else(|| {
                CodegenError::Matrix(format!("case `{test_name}` has no source method"))
            })?;
        tests.push(TestDecl {
            fn_name: test_names.claim(&rust_ident(&snake_case(&test_name))),
            test_name,
            client_fn,
            variant: case.variant.to_string(),
            description: case.description.clone(),
            case_json,
        });
    }

    Ok(ArtifactDocument {
        page_name: definition.page_name.clone(),
        base_route: definition.base_route.clone(),
        digest,
        models_file: format!("{}.models.rs", definition.page_name),
        client_file: format!("{}.client.rs", definition.page_name),
        models,
        client: ClientDecl {
            name: client_name,
            methods,
        },
        tests,
    })
}

/// Builds request fields from a data template in declaration order.
fn request_fields(data: Option<&Map<String, Value>>, optional: &BTreeSet<&str>) -> Vec<FieldDecl> {
    let mut names = UniqueNames::default();
    data.into_iter()
        .flatten()
        .map(|(key, value)| FieldDecl {
            json_name: key.clone(),
            rust_name: names.claim(&rust_ident(&snake_case(key))),
            ty: FieldType::infer(value),
            optional: optional.contains(key.as_str()),
        })
        .collect()
}

/// Builds response fields from the top-level keys a rule asserts.
///
/// Keys come from the structure template, required keys, declared data
/// types, and expected values; only plain top-level names become fields.
fn response_fields(expected: &ExpectedResponse) -> Vec<FieldDecl> {
    let ExpectedResponse::Rule(rule) = expected else {
        return Vec::new();
    };
    let mut names = UniqueNames::default();
    names.claim("extra");
    collect_response_keys(rule)
        .into_iter()
        .map(|(key, ty)| FieldDecl {
            rust_name: names.claim(&rust_ident(&snake_case(&key))),
            json_name: key,
            ty,
            optional: false,
        })
        .collect()
}

/// Collects top-level response keys with their most specific type.
fn collect_response_keys(rule: &ResponseRule) -> BTreeMap<String, FieldType> {
    let mut keys = BTreeMap::new();
    if let Some(Value::Object(structure)) = &rule.structure {
        for (key, template) in structure {
            keys.insert(key.clone(), FieldType::infer(template).widened());
        }
    }
    for (key, data_type) in &rule.data_types {
        if is_top_level(key) {
            keys.entry(key.clone()).or_insert_with(|| FieldType::from_data_type(*data_type));
        }
    }
    for (key, value) in &rule.values {
        if is_top_level(key) {
            keys.entry(key.clone()).or_insert_with(|| FieldType::infer(value).widened());
        }
    }
    for key in &rule.required_keys {
        if is_top_level(key) {
            keys.entry(key.clone()).or_insert(FieldType::Any);
        }
    }
    keys
}

/// Returns true for a plain top-level key (no path syntax).
fn is_top_level(key: &str) -> bool {
    !key.is_empty() && !key.starts_with('$') && !key.contains(['.', '['])
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Rust keywords usable as raw identifiers.
const RAW_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers.
const RESERVED_KEYWORDS: &[&str] = &["crate", "self", "super", "Self", "_"];

/// Escapes a snake-case name into a valid Rust identifier.
fn rust_ident(name: &str) -> String {
    if RESERVED_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else if RAW_KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

/// Hands out unique names, suffixing repeats with `2`, `3`, ...
#[derive(Debug, Default)]
struct UniqueNames {
    /// Names already claimed.
    taken: BTreeSet<String>,
}

impl UniqueNames {
    /// Claims `base`, or the first free suffixed form of it.
    fn claim(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let stem = base.trim_start_matches("r#");
        let separator = if stem.contains('_') || stem.chars().all(|ch| ch.is_ascii_lowercase()) {
            "_"
        } else {
            ""
        };
        let mut counter = 2_usize;
        loop {
            let candidate = format!("{stem}{separator}{counter}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
