// crates/apiforge-core/src/lib.rs
// ============================================================================
// Module: apiforge Core Library
// Description: Public API surface for the apiforge generation and validation engine.
// Purpose: Expose schema types, interfaces, and runtime engines.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! apiforge core turns declarative API test definitions into an ordered test
//! matrix and evaluates the outcome of each generated case at run time. It is
//! backend-agnostic: HTTP and storage access happen through the traits in
//! [`interfaces`], never through embedded clients.
//!
//! ### Pipeline
//! - [`core::schema`] parses and statically validates definitions.
//! - [`runtime::expand`] derives main, negative, and validation cases.
//! - [`runtime::validate_response`] and [`runtime::StorageValidator`] assert
//!   outcomes, resolving `{{context.path}}` templates through
//!   [`runtime::resolve`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CaseEvent;
pub use interfaces::EventSink;
pub use interfaces::FileEventSink;
pub use interfaces::GenerationEvent;
pub use interfaces::HttpRequest;
pub use interfaces::HttpResponse;
pub use interfaces::HttpTransport;
pub use interfaces::NoopEventSink;
pub use interfaces::PlaceholderStyle;
pub use interfaces::Row;
pub use interfaces::StderrEventSink;
pub use interfaces::StorageConnection;
pub use interfaces::StorageConnector;
pub use interfaces::StorageError;
pub use interfaces::StorageEvent;
pub use interfaces::TransportError;
pub use runtime::CaseExecutor;
pub use runtime::CaseReport;
pub use runtime::ContextName;
pub use runtime::ExecutionError;
pub use runtime::ExecutionOptions;
pub use runtime::Failure;
pub use runtime::FailureKind;
pub use runtime::StatusExpectation;
pub use runtime::StorageQuery;
pub use runtime::StorageValidationError;
pub use runtime::StorageValidator;
pub use runtime::TemplateContexts;
pub use runtime::TemplateError;
pub use runtime::UnresolvedTemplateError;
pub use runtime::ValidationResult;
pub use runtime::build_request;
pub use runtime::check_message;
pub use runtime::contains_template;
pub use runtime::expand;
pub use runtime::resolve;
pub use runtime::resolve_value;
pub use runtime::storage_equals;
pub use runtime::validate_response;
