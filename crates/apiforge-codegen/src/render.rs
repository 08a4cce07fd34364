// crates/apiforge-codegen/src/render.rs
// ============================================================================
// Module: Artifact Rendering
// Description: Text rendering of artifact documents into Rust sources.
// Purpose: Produce byte-stable models, client, and test files.
// Dependencies: crate::document
// ============================================================================

//! ## Overview
//! Rendering is a pure function of an [`ArtifactDocument`]. Each file starts
//! with the generated-file marker, the definition name, and its canonical
//! digest, so a changed definition always shows up as a header diff.
//!
//! The three files form one module tree: the tests include the client with a
//! `#[path]` module, and the client includes its models the same way, so the
//! artifacts must stay side by side in one directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use apiforge_core::HttpMethod;

use crate::document::ArtifactDocument;
use crate::document::ClientMethod;
use crate::document::FieldDecl;
use crate::document::ModelDecl;
use crate::document::ModelKind;
use crate::document::TestDecl;

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Rendered artifact sources for one definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// `{page}.models.rs` contents.
    pub models: String,
    /// `{page}.client.rs` contents.
    pub client: String,
    /// `{page}.test.rs` contents.
    pub tests: String,
}

/// Renders every artifact for a document.
#[must_use]
pub fn render(document: &ArtifactDocument) -> Artifacts {
    Artifacts {
        models: render_models(document),
        client: render_client(document),
        tests: render_tests(document),
    }
}

// ============================================================================
// SECTION: Header
// ============================================================================

/// Writes the generated-file header.
fn render_header(out: &mut String, document: &ArtifactDocument) {
    out.push_str("// This file is @generated by apiforge-codegen. DO NOT EDIT.\n");
    let _ = writeln!(out, "// Definition: {}", single_line(&document.page_name));
    let _ = writeln!(out, "// Digest: {}", document.digest);
    out.push('\n');
}

// ============================================================================
// SECTION: Models
// ============================================================================

/// Renders request and response models.
fn render_models(document: &ArtifactDocument) -> String {
    let mut out = String::new();
    render_header(&mut out, document);
    let _ = writeln!(
        out,
        "//! Request and response models for `{}`.",
        single_line(&document.page_name)
    );
    out.push('\n');
    out.push_str("#![allow(dead_code, unused_imports)]\n\n");
    out.push_str("use serde::Deserialize;\n");
    out.push_str("use serde::Serialize;\n");
    out.push_str("use serde_json::Map;\n");
    out.push_str("use serde_json::Value;\n");
    for model in &document.models {
        out.push('\n');
        render_model(&mut out, model);
    }
    out
}

/// Renders one model struct.
fn render_model(out: &mut String, model: &ModelDecl) {
    let role = match model.kind {
        ModelKind::Request => "Request body",
        ModelKind::Response => "Response body",
    };
    let _ = writeln!(out, "/// {role} for `{}`.", single_line(&model.method_name));
    out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
    let _ = writeln!(out, "pub struct {} {{", model.name);
    for field in &model.fields {
        render_field(out, field);
    }
    if model.kind == ModelKind::Response {
        out.push_str("    /// Keys not asserted by the definition.\n");
        out.push_str("    #[serde(flatten)]\n");
        out.push_str("    pub extra: Map<String, Value>,\n");
    }
    out.push_str("}\n");
}

/// Renders one model field with its serde attributes.
fn render_field(out: &mut String, field: &FieldDecl) {
    let mut attributes = Vec::new();
    if field.needs_rename() {
        attributes.push(format!("rename = {}", rust_string_literal(&field.json_name)));
    }
    if field.optional {
        attributes.push("default".to_string());
        attributes.push("skip_serializing_if = \"Option::is_none\"".to_string());
    }
    if !attributes.is_empty() {
        let _ = writeln!(out, "    #[serde({})]", attributes.join(", "));
    }
    let ty = if field.optional {
        format!("Option<{}>", field.ty.rust_type())
    } else {
        field.ty.rust_type().to_string()
    };
    let _ = writeln!(out, "    pub {}: {ty},", field.rust_name);
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Renders the typed client.
fn render_client(document: &ArtifactDocument) -> String {
    let mut out = String::new();
    render_header(&mut out, document);
    let _ = writeln!(out, "//! HTTP client for `{}`.", single_line(&document.page_name));
    out.push('\n');
    out.push_str("#![allow(dead_code)]\n\n");
    let _ = writeln!(out, "#[path = {}]", rust_string_literal(&document.models_file));
    out.push_str("pub mod models;\n\n");
    out.push_str("use apiforge_core::HttpMethod;\n");
    out.push_str("use apiforge_core::HttpResponse;\n");
    out.push_str("use apiforge_core::HttpTransport;\n");
    out.push_str("use apiforge_core::TransportError;\n");
    out.push_str("use apiforge_core::build_request;\n");
    out.push_str("use serde::Serialize;\n");
    out.push_str("use serde_json::Map;\n");
    out.push_str("use serde_json::Value;\n\n");
    out.push_str("/// Route every request is built from.\n");
    let _ = writeln!(
        out,
        "pub const BASE_ROUTE: &str = {};",
        rust_string_literal(&document.base_route)
    );
    out.push('\n');

    let name = &document.client.name;
    let _ = writeln!(out, "/// Client for `{}` endpoints.", single_line(&document.page_name));
    let _ = writeln!(out, "pub struct {name}<T> {{");
    out.push_str("    transport: T,\n");
    out.push_str("}\n\n");
    let _ = writeln!(out, "impl<T: HttpTransport> {name}<T> {{");
    out.push_str("    /// Creates a client over `transport`.\n");
    out.push_str("    pub fn new(transport: T) -> Self {\n");
    out.push_str("        Self { transport }\n");
    out.push_str("    }\n");
    for method in &document.client.methods {
        out.push('\n');
        render_client_method(&mut out, method);
        out.push('\n');
        render_typed_client_method(&mut out, method);
    }
    out.push_str("}\n\n");

    out.push_str("/// Serializes a request model into a JSON object.\n");
    out.push_str(
        "fn encode_data<D: Serialize>(data: &D) -> Result<Map<String, Value>, TransportError> {\n",
    );
    out.push_str("    match serde_json::to_value(data) {\n");
    out.push_str("        Ok(Value::Object(map)) => Ok(map),\n");
    out.push_str(
        "        Ok(_) => Err(TransportError::Request(\"request data must serialize to an \
         object\".to_string())),\n",
    );
    out.push_str("        Err(err) => Err(TransportError::Request(err.to_string())),\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

/// Renders one client method over raw JSON data.
fn render_client_method(out: &mut String, method: &ClientMethod) {
    render_doc(out, "    ", &method.description, &method.method_name);
    let _ = writeln!(out, "    pub fn {}(", method.fn_name);
    out.push_str("        &self,\n");
    out.push_str("        data: Option<&Map<String, Value>>,\n");
    out.push_str("        params: Option<&Map<String, Value>>,\n");
    out.push_str("    ) -> Result<HttpResponse, TransportError> {\n");
    let _ = writeln!(
        out,
        "        let request = build_request(BASE_ROUTE, HttpMethod::{}, data, params);",
        method_variant(method)
    );
    out.push_str("        self.transport.send(&request)\n");
    out.push_str("    }\n");
}

/// Renders the variant of a client method taking the typed request model.
fn render_typed_client_method(out: &mut String, method: &ClientMethod) {
    let _ = writeln!(
        out,
        "    /// `{}` with a typed request body.",
        single_line(&method.method_name)
    );
    let _ = writeln!(out, "    pub fn {}(", method.typed_fn_name);
    out.push_str("        &self,\n");
    let _ = writeln!(out, "        data: &models::{},", method.request_model);
    out.push_str("        params: Option<&Map<String, Value>>,\n");
    out.push_str("    ) -> Result<HttpResponse, TransportError> {\n");
    out.push_str("        let data = encode_data(data)?;\n");
    let _ = writeln!(out, "        self.{}(Some(&data), params)", method.fn_name);
    out.push_str("    }\n");
}

/// Returns the `HttpMethod` variant name.
const fn method_variant(method: &ClientMethod) -> &'static str {
    match method.method {
        HttpMethod::Get => "Get",
        HttpMethod::Post => "Post",
        HttpMethod::Put => "Put",
        HttpMethod::Delete => "Delete",
        HttpMethod::Patch => "Patch",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Renders one test per generated case.
fn render_tests(document: &ArtifactDocument) -> String {
    let mut out = String::new();
    render_header(&mut out, document);
    let _ = writeln!(out, "//! Generated tests for `{}`.", single_line(&document.page_name));
    out.push('\n');
    let _ = writeln!(out, "#[path = {}]", rust_string_literal(&document.client_file));
    out.push_str("mod client;\n\n");
    out.push_str("use apiforge_harness::Harness;\n");
    out.push_str("use apiforge_harness::HarnessError;\n");
    out.push_str("use client::BASE_ROUTE;\n");
    let _ = writeln!(out, "use client::{};", document.client.name);
    for test in &document.tests {
        out.push('\n');
        render_test(&mut out, &document.client.name, test);
    }
    out
}

/// Renders one test function.
fn render_test(out: &mut String, client_name: &str, test: &TestDecl) {
    render_doc(out, "", &test.description, &test.test_name);
    let _ = writeln!(out, "///\n/// Variant: `{}`.", single_line(&test.variant));
    out.push_str("#[test]\n");
    let _ = writeln!(out, "fn {}() -> Result<(), HarnessError> {{", test.fn_name);
    out.push_str("    let harness = Harness::from_env()?;\n");
    let _ = writeln!(out, "    let client = {client_name}::new(harness.transport());");
    let _ = writeln!(
        out,
        "    harness.check_call(BASE_ROUTE, {}, |case| {{",
        raw_string_literal(&test.case_json)
    );
    let _ = writeln!(
        out,
        "        client.{}(case.data.as_ref(), case.params.as_ref())",
        test.client_fn
    );
    out.push_str("    })\n");
    out.push_str("}\n");
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a doc comment, falling back to `fallback` for empty text.
fn render_doc(out: &mut String, indent: &str, text: &str, fallback: &str) {
    let text = if text.trim().is_empty() { fallback } else { text };
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            let _ = writeln!(out, "{indent}///");
        } else {
            let _ = writeln!(out, "{indent}/// {line}");
        }
    }
}

/// Collapses text onto one line for comments.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Renders a Rust string literal.
pub(crate) fn rust_string_literal(value: &str) -> String {
    format!("{value:?}")
}

/// Renders a raw string literal with enough `#` to enclose `value`.
pub(crate) fn raw_string_literal(value: &str) -> String {
    let mut longest = 0;
    let mut run: Option<usize> = None;
    for ch in value.chars() {
        run = match (ch, run) {
            ('"', _) => Some(0),
            ('#', Some(count)) => {
                longest = longest.max(count + 1);
                Some(count + 1)
            }
            _ => None,
        };
    }
    let hashes = "#".repeat(longest + 1);
    format!("r{hashes}\"{value}\"{hashes}")
}
