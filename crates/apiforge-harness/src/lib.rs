// crates/apiforge-harness/src/lib.rs
// ============================================================================
// Module: apiforge Harness
// Description: Runtime entry points for generated tests and live runs.
// Purpose: Wire configuration, transport, storage, and sinks into the executor.
// Dependencies: apiforge-config, apiforge-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`Harness`] owns the transport, optional storage connector, and event
//! sink for a test process. Generated `*.test.rs` files embed each case as
//! JSON, issue the call through the generated client over
//! [`Harness::transport`], and hand the response to [`Harness::check_call`].
//! The CLI `run` command drives a whole definition through
//! [`Harness::run_definition`].
//!
//! Assertion failures and infrastructure faults stay distinct:
//! [`HarnessError::Failed`] carries accumulated failures, while
//! [`HarnessError::Execution`] reports transport, storage, or template faults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use apiforge_config::ApiforgeConfig;
use apiforge_core::ApiDefinition;
use apiforge_core::CaseExecutor;
use apiforge_core::CaseReport;
use apiforge_core::EventSink;
use apiforge_core::ExecutionOptions;
use apiforge_core::GeneratedCase;
use apiforge_core::HttpRequest;
use apiforge_core::HttpResponse;
use apiforge_core::HttpTransport;
use apiforge_core::StorageConnector;
use apiforge_core::TransportError;
use apiforge_core::expand;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Harness errors.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration could not be loaded or applied.
    #[error("harness config error: {0}")]
    Config(String),
    /// Embedded case JSON did not decode.
    #[error("invalid embedded case: {0}")]
    Case(String),
    /// Transport, storage, or template fault.
    #[error("{test_name}: {message}")]
    Execution {
        /// Generated test name.
        test_name: String,
        /// Fault description.
        message: String,
    },
    /// One or more assertions failed.
    #[error("{test_name} failed:\n{failures}")]
    Failed {
        /// Generated test name.
        test_name: String,
        /// Rendered failure list.
        failures: String,
    },
}

// ============================================================================
// SECTION: Client Transport
// ============================================================================

/// Transport handed to generated clients.
///
/// Adds the executor's extra headers so client calls match what
/// [`Harness::run_case`] would send.
#[derive(Clone, Copy)]
pub struct ClientTransport<'a> {
    /// Underlying transport.
    inner: &'a dyn HttpTransport,
    /// Headers added to every request.
    headers: &'a BTreeMap<String, String>,
}

impl HttpTransport for ClientTransport<'_> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if self.headers.is_empty() {
            return self.inner.send(request);
        }
        let mut request = request.clone();
        request.headers.extend(self.headers.clone());
        self.inner.send(&request)
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Executes generated cases with process-wide resources.
pub struct Harness {
    /// HTTP transport.
    transport: Box<dyn HttpTransport>,
    /// Storage connector for storage rules.
    storage: Option<Box<dyn StorageConnector>>,
    /// Event sink.
    sink: Box<dyn EventSink>,
    /// Executor options.
    options: ExecutionOptions,
}

impl Harness {
    /// Creates a harness without storage access.
    #[must_use]
    pub fn new(transport: Box<dyn HttpTransport>, sink: Box<dyn EventSink>) -> Self {
        Self {
            transport,
            storage: None,
            sink,
            options: ExecutionOptions::default(),
        }
    }

    /// Attaches a storage connector.
    #[must_use]
    pub fn with_storage(mut self, storage: Box<dyn StorageConnector>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replaces the executor options.
    #[must_use]
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds a harness from the configuration the environment points at.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when configuration cannot be loaded
    /// or no HTTP base URL is configured.
    pub fn from_env() -> Result<Self, HarnessError> {
        let config =
            ApiforgeConfig::load(None).map_err(|err| HarnessError::Config(err.to_string()))?;
        Self::from_config(&config)
    }

    /// Builds a harness from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when the transport, storage pool, or
    /// sink cannot be built.
    pub fn from_config(config: &ApiforgeConfig) -> Result<Self, HarnessError> {
        let config_err = |err: apiforge_config::ConfigError| HarnessError::Config(err.to_string());
        let transport = config.http_transport().map_err(config_err)?;
        let sink = config.event_sink().map_err(config_err)?;
        let mut harness =
            Self::new(Box::new(transport), sink).with_options(config.execution_options());
        if let Some(storage) = config.storage_connector().map_err(config_err)? {
            harness = harness.with_storage(Box::new(storage));
        }
        Ok(harness)
    }

    /// Returns the transport generated clients send through.
    #[must_use]
    pub fn transport(&self) -> ClientTransport<'_> {
        ClientTransport {
            inner: self.transport.as_ref(),
            headers: &self.options.headers,
        }
    }

    /// Builds an executor over the harness resources.
    fn executor(&self) -> CaseExecutor<'_> {
        let mut executor = CaseExecutor::new(self.transport.as_ref(), self.sink.as_ref())
            .with_options(self.options.clone());
        if let Some(storage) = self.storage.as_deref() {
            executor = executor.with_storage(storage);
        }
        executor
    }

    /// Runs one case and returns its report, failures included.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Execution`] on infrastructure faults.
    pub fn run_case(
        &self,
        base_route: &str,
        case: &GeneratedCase,
    ) -> Result<CaseReport, HarnessError> {
        self.executor().run(base_route, case).map_err(|err| HarnessError::Execution {
            test_name: case.test_name(),
            message: err.to_string(),
        })
    }

    /// Runs one case and fails when any assertion failed.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Failed`] with every failure, or
    /// [`HarnessError::Execution`] on infrastructure faults.
    pub fn check_case(
        &self,
        base_route: &str,
        case: &GeneratedCase,
    ) -> Result<CaseReport, HarnessError> {
        let report = self.run_case(base_route, case)?;
        require_passed(report)
    }

    /// Decodes an embedded case and checks it.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Case`] when the JSON does not decode, plus the
    /// errors of [`Harness::check_case`].
    pub fn check_case_json(&self, base_route: &str, case_json: &str) -> Result<(), HarnessError> {
        let case: GeneratedCase =
            serde_json::from_str(case_json).map_err(|err| HarnessError::Case(err.to_string()))?;
        self.check_case(base_route, &case).map(|_| ())
    }

    /// Decodes an embedded case, issues it through `call`, and checks the
    /// response with every assertion the case carries.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Case`] when the JSON does not decode,
    /// [`HarnessError::Execution`] when `call` or storage fails, and
    /// [`HarnessError::Failed`] when any assertion failed.
    pub fn check_call<F>(
        &self,
        base_route: &str,
        case_json: &str,
        call: F,
    ) -> Result<(), HarnessError>
    where
        F: FnOnce(&GeneratedCase) -> Result<HttpResponse, TransportError>,
    {
        let case: GeneratedCase =
            serde_json::from_str(case_json).map_err(|err| HarnessError::Case(err.to_string()))?;
        let report = self.executor().run_with(base_route, &case, |_| call(&case)).map_err(
            |err| HarnessError::Execution {
                test_name: case.test_name(),
                message: err.to_string(),
            },
        )?;
        require_passed(report).map(|_| ())
    }

    /// Expands and runs every case of a definition in matrix order.
    #[must_use]
    pub fn run_definition(&self, definition: &ApiDefinition) -> RunSummary {
        let outcomes = expand(definition)
            .into_iter()
            .map(|case| {
                let result = self.run_case(&definition.base_route, &case);
                CaseOutcome {
                    test_name: case.test_name(),
                    variant: case.variant.to_string(),
                    result,
                }
            })
            .collect();
        RunSummary {
            page_name: definition.page_name.clone(),
            outcomes,
        }
    }
}

/// Converts a report with failures into [`HarnessError::Failed`].
fn require_passed(report: CaseReport) -> Result<CaseReport, HarnessError> {
    if report.is_ok() {
        Ok(report)
    } else {
        Err(HarnessError::Failed {
            test_name: report.test_name.clone(),
            failures: report.result.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Run Summary
// ============================================================================

/// Outcome of one case in a definition run.
#[derive(Debug)]
pub struct CaseOutcome {
    /// Generated test name.
    pub test_name: String,
    /// Variant label.
    pub variant: String,
    /// Report or infrastructure fault.
    pub result: Result<CaseReport, HarnessError>,
}

impl CaseOutcome {
    /// Returns true when the case ran and every assertion passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.result.as_ref().is_ok_and(CaseReport::is_ok)
    }
}

/// Outcomes for every case of one definition.
#[derive(Debug)]
pub struct RunSummary {
    /// Definition name.
    pub page_name: String,
    /// Case outcomes in matrix order.
    pub outcomes: Vec<CaseOutcome>,
}

impl RunSummary {
    /// Returns the number of passing cases.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.passed()).count()
    }

    /// Returns the number of failing or faulted cases.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }
}
