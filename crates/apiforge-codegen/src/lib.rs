// crates/apiforge-codegen/src/lib.rs
// ============================================================================
// Module: apiforge Codegen Library
// Description: Deterministic emitter for per-definition Rust artifacts.
// Purpose: Render models, a typed client, and harness-driven tests.
// Dependencies: apiforge-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`emit`] is a pure function from a definition and its expanded matrix to
//! three Rust sources: request/response models, a client with one method
//! per `methodName`, and one `#[test]` per generated case in matrix order.
//! Emission first builds an [`ArtifactDocument`] and renders it separately;
//! the same input always yields byte-identical output.
//!
//! ## Index
//! - Document: [`build_document`], [`ArtifactDocument`]
//! - Rendering: [`render`], [`Artifacts`]
//! - Output: [`generate`], [`ArtifactPaths`], [`OutputMode`]

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod document;
pub mod output;
pub mod render;

// ============================================================================
// SECTION: Imports
// ============================================================================

use apiforge_core::ApiDefinition;
use apiforge_core::GeneratedCase;
use thiserror::Error;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::ArtifactDocument;
pub use document::build_document;
pub use output::ArtifactPaths;
pub use output::DefinitionOutcome;
pub use output::DefinitionStatus;
pub use output::GenerationReport;
pub use output::OutputMode;
pub use output::check_artifacts;
pub use output::generate;
pub use output::write_artifacts;
pub use render::Artifacts;
pub use render::render;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the emitter.
///
/// # Invariants
/// - Variant meanings are stable for automation and tests.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// IO error while reading or writing artifacts.
    #[error("io error: {0}")]
    Io(String),
    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(String),
    /// Expanded cases do not belong to the definition.
    #[error("case matrix mismatch: {0}")]
    Matrix(String),
    /// Definition digest could not be computed.
    #[error("digest error: {0}")]
    Digest(String),
    /// Artifact path would be unsafe or malformed.
    #[error("invalid artifact path: {0}")]
    InvalidPath(String),
}

// ============================================================================
// SECTION: Emission
// ============================================================================

/// Emits the artifacts for one definition and its expanded matrix.
///
/// # Errors
///
/// Returns [`CodegenError`] when the digest or a case cannot be serialized.
pub fn emit(
    definition: &ApiDefinition,
    cases: &[GeneratedCase],
) -> Result<Artifacts, CodegenError> {
    let document = build_document(definition, cases)?;
    Ok(render(&document))
}
