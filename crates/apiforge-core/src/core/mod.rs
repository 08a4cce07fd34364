// crates/apiforge-core/src/core/mod.rs
// ============================================================================
// Module: apiforge Core Types
// Description: Canonical schema, generated case, and value helper types.
// Purpose: Provide stable, serializable types shared by generation and runtime.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types define API test definitions as authored, the cases derived from
//! them, and the JSON value helpers (paths, shapes, equality) that the runtime
//! engines build on. These types are the source of truth for emitted artifacts.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod case;
pub mod hashing;
pub mod path;
pub mod scaffold;
pub mod schema;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use case::CaseSource;
pub use case::CaseVariant;
pub use case::GeneratedCase;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::definition_digest;
pub use path::FieldPath;
pub use scaffold::IssueMetadata;
pub use scaffold::scaffold_definition;
pub use schema::ApiDefinition;
pub use schema::ArrayValidation;
pub use schema::CompareSource;
pub use schema::DefinitionLoad;
pub use schema::ExpectedResponse;
pub use schema::HttpMethod;
pub use schema::RejectedDefinition;
pub use schema::RequiredEntry;
pub use schema::ResponseRule;
pub use schema::SchemaError;
pub use schema::SchemaViolation;
pub use schema::StorageRule;
pub use schema::StorageTarget;
pub use schema::TestCase;
pub use schema::ValidationCase;
pub use schema::load_definitions;
pub use schema::parse_definitions;
pub use schema::read_definitions;
pub use value::DataType;
pub use value::ShapeClass;
pub use value::is_empty_body;
pub use value::strict_equals;
pub use value::value_kind;
