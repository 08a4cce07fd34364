// crates/apiforge-core/src/runtime/executor.rs
// ============================================================================
// Module: apiforge Case Executor
// Description: Issue a generated case over HTTP and assert its outcome.
// Purpose: Run one matrix row end to end for emitted tests and the CLI.
// Dependencies: crate::{core, interfaces, runtime}, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! The executor builds the request for a [`GeneratedCase`] (path parameters
//! substituted into the base route, remaining parameters as query string),
//! sends it through an [`HttpTransport`], then runs response validation, the
//! optional message check, and storage validation. Assertion failures are
//! accumulated in the [`CaseReport`]; infrastructure faults and unresolved
//! templates surface as [`ExecutionError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::GeneratedCase;
use crate::core::HttpMethod;
use crate::interfaces::CaseEvent;
use crate::interfaces::EventSink;
use crate::interfaces::HttpRequest;
use crate::interfaces::HttpResponse;
use crate::interfaces::HttpTransport;
use crate::interfaces::StorageConnector;
use crate::interfaces::StorageError;
use crate::interfaces::TransportError;
use crate::runtime::response::StatusExpectation;
use crate::runtime::response::ValidationResult;
use crate::runtime::response::check_message;
use crate::runtime::response::validate_response;
use crate::runtime::storage::StorageValidationError;
use crate::runtime::storage::StorageValidator;
use crate::runtime::template::TemplateContexts;
use crate::runtime::template::TemplateError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Infrastructure or resolution fault while running a case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// HTTP transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A template did not resolve.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// Storage lookup failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<StorageValidationError> for ExecutionError {
    fn from(err: StorageValidationError) -> Self {
        match err {
            StorageValidationError::Template(err) => Self::Template(err),
            StorageValidationError::Storage(err) => Self::Storage(err),
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Builds the HTTP request for a case.
///
/// Parameters named by `{name}` or `:name` route segments are substituted
/// into the path; the rest become query pairs in parameter order.
#[must_use]
pub fn build_request(
    base_route: &str,
    method: HttpMethod,
    data: Option<&Map<String, Value>>,
    params: Option<&Map<String, Value>>,
) -> HttpRequest {
    let mut path = base_route.to_string();
    let mut query = Vec::new();
    for (name, value) in params.into_iter().flatten() {
        let rendered = param_text(value);
        let braced = format!("{{{name}}}");
        let colon = format!(":{name}");
        if path.contains(&braced) {
            path = path.replace(&braced, &encode_segment(&rendered));
        } else if path.split('/').any(|segment| segment == colon) {
            path = path
                .split('/')
                .map(|segment| {
                    if segment == colon { encode_segment(&rendered) } else { segment.to_string() }
                })
                .collect::<Vec<_>>()
                .join("/");
        } else {
            query.push((name.clone(), rendered));
        }
    }
    HttpRequest {
        method,
        path,
        query,
        headers: BTreeMap::new(),
        body: data.map(|data| Value::Object(data.clone())),
    }
}

/// Renders a parameter value as text (strings raw, others as JSON).
fn param_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Percent-encodes a path segment.
fn encode_segment(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect::<String>().replace('+', "%20")
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Executor tuning knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Response field compared against a case's message key.
    pub message_field: Option<String>,
    /// Headers added to every request.
    pub headers: BTreeMap<String, String>,
}

/// Outcome of one executed case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    /// Generated test name.
    pub test_name: String,
    /// Request that was sent.
    pub request: HttpRequest,
    /// Response that was received.
    pub response: HttpResponse,
    /// Accumulated assertion failures.
    pub result: ValidationResult,
}

impl CaseReport {
    /// Returns true when every assertion passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs generated cases against a transport and optional store.
pub struct CaseExecutor<'a> {
    /// HTTP transport.
    transport: &'a dyn HttpTransport,
    /// Storage connector for cases with storage rules.
    storage: Option<&'a dyn StorageConnector>,
    /// Event sink.
    sink: &'a dyn EventSink,
    /// Executor options.
    options: ExecutionOptions,
}

impl<'a> CaseExecutor<'a> {
    /// Creates an executor without storage access.
    #[must_use]
    pub fn new(transport: &'a dyn HttpTransport, sink: &'a dyn EventSink) -> Self {
        Self {
            transport,
            storage: None,
            sink,
            options: ExecutionOptions::default(),
        }
    }

    /// Attaches a storage connector.
    #[must_use]
    pub fn with_storage(mut self, storage: &'a dyn StorageConnector) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replaces the executor options.
    #[must_use]
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Executes one generated case against `base_route`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] on transport or storage faults, or when a
    /// storage template does not resolve.
    pub fn run(
        &self,
        base_route: &str,
        case: &GeneratedCase,
    ) -> Result<CaseReport, ExecutionError> {
        self.run_with(base_route, case, |request| self.transport.send(request))
    }

    /// Executes one generated case, issuing the call through `send`.
    ///
    /// `send` receives the request the executor would have sent; generated
    /// tests use it to route the call through their typed client.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] on transport or storage faults, or when a
    /// storage template does not resolve.
    pub fn run_with<F>(
        &self,
        base_route: &str,
        case: &GeneratedCase,
        send: F,
    ) -> Result<CaseReport, ExecutionError>
    where
        F: FnOnce(&HttpRequest) -> Result<HttpResponse, TransportError>,
    {
        let mut request =
            build_request(base_route, case.method, case.data.as_ref(), case.params.as_ref());
        request.headers.extend(self.options.headers.clone());

        let mut event = CaseEvent::new(
            case.test_name(),
            case.variant.to_string(),
            case.method.as_str(),
            request.path_and_query(),
        );
        event.expected_status = case.expect_status;

        let outcome = send(&request)
            .map_err(ExecutionError::from)
            .and_then(|response| self.evaluate(response, case));
        match &outcome {
            Ok((response, result)) => {
                event.actual_status = Some(response.status);
                event.failures = result.failures.len();
            }
            Err(err) => event.error = Some(err.to_string()),
        }
        self.sink.record_case(&event);

        let (response, result) = outcome?;
        Ok(CaseReport {
            test_name: case.test_name(),
            request,
            response,
            result,
        })
    }

    /// Evaluates every assertion against a received response.
    fn evaluate(
        &self,
        response: HttpResponse,
        case: &GeneratedCase,
    ) -> Result<(HttpResponse, ValidationResult), ExecutionError> {
        let mut result = validate_response(
            response.body.as_ref(),
            &case.expected_response,
            StatusExpectation {
                expected: case.expect_status,
                actual: response.status,
            },
        );
        if let (Some(field), Some(key)) = (&self.options.message_field, &case.message_key)
            && let Some(failure) = check_message(response.body.as_ref(), field, key)
        {
            result.push(failure);
        }
        if let Some(rule) = &case.database_validation {
            let Some(storage) = self.storage else {
                return Err(ExecutionError::Storage(StorageError::Connection(
                    "case has a storage rule but no storage connector is configured".to_string(),
                )));
            };
            let contexts = TemplateContexts::new()
                .with_request_data(Value::Object(case.data.clone().unwrap_or_default()))
                .with_params(Value::Object(case.params.clone().unwrap_or_default()))
                .with_response_data(response.body.clone().unwrap_or(Value::Null));
            let storage_result =
                StorageValidator::new(storage, self.sink).validate(rule, &contexts)?;
            result.merge(storage_result);
        }
        Ok((response, result))
    }
}
