// crates/apiforge-core/src/interfaces/events.rs
// ============================================================================
// Module: apiforge Events
// Description: Structured generation, execution, and storage events.
// Purpose: Emit JSON-line logs without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Events are small serializable payloads routed through an [`EventSink`].
//! Sinks write one JSON object per line to stderr or an append-only file, or
//! discard events entirely. Storage events carry the SQL text and bound
//! parameters so infrastructure faults can be reproduced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Event Payloads
// ============================================================================

/// Returns the current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Definition emission outcome.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Definition index in the input.
    pub definition_index: usize,
    /// Definition name when known.
    pub page_name: Option<String>,
    /// Outcome label (`emitted`, `unchanged`, `drift`, `rejected`).
    pub outcome: &'static str,
    /// Artifact paths written or checked.
    pub artifacts: Vec<String>,
    /// Violation messages for rejected definitions.
    pub violations: Vec<String>,
}

impl GenerationEvent {
    /// Creates a generation event.
    #[must_use]
    pub fn new(definition_index: usize, page_name: Option<String>, outcome: &'static str) -> Self {
        Self {
            event: "definition_generation",
            timestamp_ms: now_ms(),
            definition_index,
            page_name,
            outcome,
            artifacts: Vec::new(),
            violations: Vec::new(),
        }
    }
}

/// Generated case execution outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CaseEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Generated test name.
    pub test_name: String,
    /// Variant label.
    pub variant: String,
    /// HTTP method.
    pub method: &'static str,
    /// Request path and query.
    pub path: String,
    /// Expected status.
    pub expected_status: u16,
    /// Received status when a response arrived.
    pub actual_status: Option<u16>,
    /// Number of assertion failures.
    pub failures: usize,
    /// Infrastructure error message, if any.
    pub error: Option<String>,
}

impl CaseEvent {
    /// Creates a case event with no outcome recorded yet.
    #[must_use]
    pub fn new(test_name: String, variant: String, method: &'static str, path: String) -> Self {
        Self {
            event: "case_executed",
            timestamp_ms: now_ms(),
            test_name,
            variant,
            method,
            path,
            expected_status: 0,
            actual_status: None,
            failures: 0,
            error: None,
        }
    }
}

/// Storage lookup outcome, including reproduction context.
#[derive(Debug, Clone, Serialize)]
pub struct StorageEvent {
    /// Event identifier (`storage_query` or `storage_error`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// SQL text.
    pub sql: String,
    /// Bound parameters in order.
    pub params: Vec<Value>,
    /// Rows fetched on success.
    pub rows: Option<usize>,
    /// Error message on failure.
    pub error: Option<String>,
}

impl StorageEvent {
    /// Creates a successful query event.
    #[must_use]
    pub fn query(sql: &str, params: &[Value], rows: usize) -> Self {
        Self {
            event: "storage_query",
            timestamp_ms: now_ms(),
            sql: sql.to_string(),
            params: params.to_vec(),
            rows: Some(rows),
            error: None,
        }
    }

    /// Creates a failed query event.
    #[must_use]
    pub fn error(sql: &str, params: &[Value], error: &str) -> Self {
        Self {
            event: "storage_error",
            timestamp_ms: now_ms(),
            sql: sql.to_string(),
            params: params.to_vec(),
            rows: None,
            error: Some(error.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink for structured logs.
pub trait EventSink: Send + Sync {
    /// Records a generation event.
    fn record_generation(&self, _event: &GenerationEvent) {}

    /// Records a case execution event.
    fn record_case(&self, _event: &CaseEvent) {}

    /// Records a storage event.
    fn record_storage(&self, _event: &StorageEvent) {}
}

/// Serializes an event into a single JSON line.
fn json_line<T: Serialize>(event: &T) -> Option<String> {
    serde_json::to_string(event).ok()
}

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl StderrEventSink {
    /// Writes one line to stderr, ignoring broken pipes.
    fn emit(line: Option<String>) {
        if let Some(line) = line {
            let _ = writeln!(io::stderr(), "{line}");
        }
    }
}

impl EventSink for StderrEventSink {
    fn record_generation(&self, event: &GenerationEvent) {
        Self::emit(json_line(event));
    }

    fn record_case(&self, event: &CaseEvent) {
        Self::emit(json_line(event));
    }

    fn record_storage(&self, event: &StorageEvent) {
        Self::emit(json_line(event));
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one line and flushes.
    fn emit(&self, line: Option<String>) {
        if let Some(line) = line
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }
}

impl EventSink for FileEventSink {
    fn record_generation(&self, event: &GenerationEvent) {
        self.emit(json_line(event));
    }

    fn record_case(&self, event: &CaseEvent) {
        self.emit(json_line(event));
    }

    fn record_storage(&self, event: &StorageEvent) {
        self.emit(json_line(event));
    }
}

/// Event sink that discards events.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {}
