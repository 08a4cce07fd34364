// crates/apiforge-core/src/runtime/mod.rs
// ============================================================================
// Module: apiforge Runtime
// Description: Matrix expansion, template resolution, and validation engines.
// Purpose: Turn definitions into cases and cases into pass/fail outcomes.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime engines are stateless across calls. Expansion runs at generation
//! time; template resolution and the response and storage engines run once
//! per executed case.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod executor;
pub mod expand;
pub mod response;
pub mod storage;
pub mod template;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use executor::CaseExecutor;
pub use executor::CaseReport;
pub use executor::ExecutionError;
pub use executor::ExecutionOptions;
pub use executor::build_request;
pub use expand::expand;
pub use response::Failure;
pub use response::FailureKind;
pub use response::StatusExpectation;
pub use response::ValidationResult;
pub use response::check_message;
pub use response::validate_response;
pub use storage::StorageQuery;
pub use storage::StorageValidationError;
pub use storage::StorageValidator;
pub use storage::storage_equals;
pub use template::ContextName;
pub use template::TemplateContexts;
pub use template::TemplateError;
pub use template::UnresolvedTemplateError;
pub use template::contains_template;
pub use template::resolve;
pub use template::resolve_value;
