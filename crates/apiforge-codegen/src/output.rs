// crates/apiforge-codegen/src/output.rs
// ============================================================================
// Module: Artifact Output
// Description: Artifact paths, atomic writes, drift checks, and batch generation.
// Purpose: Persist emitted artifacts so re-runs yield clean diffs.
// Dependencies: apiforge-core, crate::{document, render}
// ============================================================================

//! ## Overview
//! [`generate`] emits every accepted definition of a [`DefinitionLoad`] and
//! reports rejected ones without touching their artifacts. In
//! [`OutputMode::Write`] files are replaced through a temporary sibling and a
//! rename, and unchanged files are left alone. In [`OutputMode::Check`]
//! nothing is written; differing or missing files are reported as drift.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use apiforge_core::ApiDefinition;
use apiforge_core::DefinitionLoad;
use apiforge_core::EventSink;
use apiforge_core::GenerationEvent;
use apiforge_core::SchemaViolation;
use apiforge_core::expand;

use crate::CodegenError;
use crate::emit;
use crate::render::Artifacts;

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Paths of the three artifacts for one definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `{dir}/{page}.models.rs`.
    pub models: PathBuf,
    /// `{dir}/{page}.client.rs`.
    pub client: PathBuf,
    /// `{dir}/{page}.test.rs`.
    pub tests: PathBuf,
}

impl ArtifactPaths {
    /// Resolves artifact paths under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::InvalidPath`] when the folder or page name
    /// would escape `root`.
    pub fn resolve(root: &Path, definition: &ApiDefinition) -> Result<Self, CodegenError> {
        let folder = Path::new(definition.output_dir());
        if folder.as_os_str().is_empty()
            || !folder.components().all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(CodegenError::InvalidPath(format!(
                "output folder `{}` must be a relative path without `..`",
                folder.display()
            )));
        }
        let page = definition.page_name.as_str();
        if page.contains(['/', '\\']) || page == "." || page == ".." {
            return Err(CodegenError::InvalidPath(format!(
                "page name `{page}` cannot be used as a file name"
            )));
        }
        let dir = root.join(folder);
        Ok(Self {
            models: dir.join(format!("{page}.models.rs")),
            client: dir.join(format!("{page}.client.rs")),
            tests: dir.join(format!("{page}.test.rs")),
        })
    }

    /// Pairs each path with its rendered contents.
    fn with<'a>(&'a self, artifacts: &'a Artifacts) -> [(&'a Path, &'a str); 3] {
        [
            (self.models.as_path(), artifacts.models.as_str()),
            (self.client.as_path(), artifacts.client.as_str()),
            (self.tests.as_path(), artifacts.tests.as_str()),
        ]
    }
}

// ============================================================================
// SECTION: Writing and Checking
// ============================================================================

/// Output handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Write changed artifacts.
    Write,
    /// Compare against existing artifacts without writing.
    Check,
}

/// Writes artifacts, skipping files whose contents already match.
///
/// Returns the paths that were written.
///
/// # Errors
///
/// Returns [`CodegenError::Io`] when a directory or file cannot be written.
pub fn write_artifacts(
    paths: &ArtifactPaths,
    artifacts: &Artifacts,
) -> Result<Vec<PathBuf>, CodegenError> {
    let mut written = Vec::new();
    for (path, contents) in paths.with(artifacts) {
        if fs::read_to_string(path).is_ok_and(|existing| existing == contents) {
            continue;
        }
        write_file_atomic(path, contents)?;
        written.push(path.to_path_buf());
    }
    Ok(written)
}

/// Returns the artifact paths whose on-disk contents differ or are missing.
///
/// # Errors
///
/// Returns [`CodegenError::Io`] when an existing file cannot be read.
pub fn check_artifacts(
    paths: &ArtifactPaths,
    artifacts: &Artifacts,
) -> Result<Vec<PathBuf>, CodegenError> {
    let mut drifted = Vec::new();
    for (path, contents) in paths.with(artifacts) {
        match fs::read_to_string(path) {
            Ok(existing) if existing == contents => {}
            Ok(_) => drifted.push(path.to_path_buf()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                drifted.push(path.to_path_buf());
            }
            Err(err) => return Err(CodegenError::Io(format!("{}: {err}", path.display()))),
        }
    }
    Ok(drifted)
}

/// Writes a file through a temporary sibling and a rename.
fn write_file_atomic(path: &Path, contents: &str) -> Result<(), CodegenError> {
    let io_err = |err: std::io::Error| CodegenError::Io(format!("{}: {err}", path.display()));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let temp_path = path.with_extension("rs.tmp");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(io_err)?;
    file.write_all(contents.as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    fs::rename(&temp_path, path).map_err(io_err)
}

// ============================================================================
// SECTION: Batch Generation
// ============================================================================

/// Per-definition generation outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionStatus {
    /// At least one artifact was written.
    Emitted(Vec<PathBuf>),
    /// Every artifact already matched.
    Unchanged,
    /// Check mode found differing or missing artifacts.
    Drift(Vec<PathBuf>),
    /// The definition failed validation; nothing was emitted.
    Rejected(Vec<SchemaViolation>),
}

/// Generation outcome for one definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionOutcome {
    /// Index in the input sequence.
    pub index: usize,
    /// Definition name when known.
    pub page_name: Option<String>,
    /// Outcome.
    pub status: DefinitionStatus,
}

/// Generation outcomes in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// One outcome per input definition.
    pub outcomes: Vec<DefinitionOutcome>,
}

impl GenerationReport {
    /// Returns true when nothing was rejected and no drift was found.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| {
            !matches!(outcome.status, DefinitionStatus::Rejected(_) | DefinitionStatus::Drift(_))
        })
    }

    /// Returns every violation across rejected definitions.
    #[must_use]
    pub fn violations(&self) -> Vec<&SchemaViolation> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                DefinitionStatus::Rejected(violations) => Some(violations),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// Emits every accepted definition and reports rejected ones.
///
/// # Errors
///
/// Returns [`CodegenError`] on emission or I/O failure; schema violations and
/// unusable output paths are reported in the [`GenerationReport`] instead.
pub fn generate(
    load: &DefinitionLoad,
    root: &Path,
    mode: OutputMode,
    sink: &dyn EventSink,
) -> Result<GenerationReport, CodegenError> {
    let mut outcomes = Vec::new();
    for rejected in &load.rejected {
        outcomes.push(rejected_outcome(
            sink,
            rejected.index,
            rejected.page_name.clone(),
            rejected.violations.clone(),
        ));
    }
    for (position, definition) in load.definitions.iter().enumerate() {
        let index = load.indices.get(position).copied().unwrap_or(position);
        let paths = match ArtifactPaths::resolve(root, definition) {
            Ok(paths) => paths,
            Err(err) => {
                let page_name =
                    Some(definition.page_name.clone()).filter(|name| !name.trim().is_empty());
                let violation = SchemaViolation {
                    definition_index: index,
                    page_name: page_name.clone(),
                    field: "<output>".to_string(),
                    message: err.to_string(),
                };
                outcomes.push(rejected_outcome(sink, index, page_name, vec![violation]));
                continue;
            }
        };
        let artifacts = emit(definition, &expand(definition))?;
        let status = match mode {
            OutputMode::Write => {
                let written = write_artifacts(&paths, &artifacts)?;
                if written.is_empty() {
                    DefinitionStatus::Unchanged
                } else {
                    DefinitionStatus::Emitted(written)
                }
            }
            OutputMode::Check => {
                let drifted = check_artifacts(&paths, &artifacts)?;
                if drifted.is_empty() {
                    DefinitionStatus::Unchanged
                } else {
                    DefinitionStatus::Drift(drifted)
                }
            }
        };
        let (label, touched) = match &status {
            DefinitionStatus::Emitted(paths) => ("emitted", paths.as_slice()),
            DefinitionStatus::Drift(paths) => ("drift", paths.as_slice()),
            _ => ("unchanged", &[][..]),
        };
        let mut event = GenerationEvent::new(index, Some(definition.page_name.clone()), label);
        event.artifacts = touched.iter().map(|path| path.display().to_string()).collect();
        sink.record_generation(&event);
        outcomes.push(DefinitionOutcome {
            index,
            page_name: Some(definition.page_name.clone()),
            status,
        });
    }
    outcomes.sort_by_key(|outcome| outcome.index);
    Ok(GenerationReport {
        outcomes,
    })
}

/// Records a rejection event and builds its outcome.
fn rejected_outcome(
    sink: &dyn EventSink,
    index: usize,
    page_name: Option<String>,
    violations: Vec<SchemaViolation>,
) -> DefinitionOutcome {
    let mut event = GenerationEvent::new(index, page_name.clone(), "rejected");
    event.violations = violations.iter().map(ToString::to_string).collect();
    sink.record_generation(&event);
    DefinitionOutcome {
        index,
        page_name,
        status: DefinitionStatus::Rejected(violations),
    }
}
