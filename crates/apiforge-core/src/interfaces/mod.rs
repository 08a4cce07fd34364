// crates/apiforge-core/src/interfaces/mod.rs
// ============================================================================
// Module: apiforge Interfaces
// Description: Backend-agnostic HTTP transport, storage, and event interfaces.
// Purpose: Define the contract surfaces consumed by the runtime engines.
// Dependencies: crate::core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The runtime engines never embed an HTTP client or database driver. They
//! issue calls through [`HttpTransport`], run lookups through
//! [`StorageConnector`], and report structured events through [`EventSink`].
//! Reference implementations live in the `apiforge-http` and
//! `apiforge-store-sqlite` crates.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod events;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::HttpMethod;

pub use events::CaseEvent;
pub use events::EventSink;
pub use events::FileEventSink;
pub use events::GenerationEvent;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use events::StorageEvent;

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Outbound HTTP request issued by a generated case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Route path with path parameters substituted.
    pub path: String,
    /// Query string pairs in insertion order.
    #[serde(default)]
    pub query: Vec<(String, String)>,
    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON request body.
    #[serde(default)]
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Returns the path with the encoded query string appended.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        let separator = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.path)
    }
}

/// HTTP response returned to a generated case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (lowercase names).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Raw response text.
    #[serde(default)]
    pub text: String,
    /// Parsed body: JSON when parseable, otherwise the raw text, `None` when empty.
    #[serde(default)]
    pub body: Option<Value>,
}

impl HttpResponse {
    /// Builds a response from raw text, parsing JSON when possible.
    #[must_use]
    pub fn from_text(status: u16, headers: BTreeMap<String, String>, text: String) -> Self {
        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone())))
        };
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    /// Asserts the response status.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::UnexpectedStatus`] when the status differs.
    pub fn assert_status(&self, expected: u16) -> Result<&Self, TransportError> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(TransportError::UnexpectedStatus {
                expected,
                actual: self.status,
            })
        }
    }
}

/// HTTP transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Request URL could not be built.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    /// Request failed before a response was received.
    #[error("http request failed: {0}")]
    Request(String),
    /// Response body exceeded the configured limit.
    #[error("http response exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Configured size limit.
        limit: usize,
    },
    /// Response status differs from the asserted status.
    #[error("unexpected http status {actual} (expected {expected})")]
    UnexpectedStatus {
        /// Asserted status.
        expected: u16,
        /// Received status.
        actual: u16,
    },
}

/// Blocking HTTP transport used by generated clients.
pub trait HttpTransport {
    /// Sends a request and returns the response.
    ///
    /// Non-2xx statuses are responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection, timeout, or size-limit faults.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Result row keyed by column name.
pub type Row = Map<String, Value>;

/// Positional placeholder syntax used by a storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?` placeholders (SQLite, MySQL).
    #[default]
    Question,
    /// `$1`, `$2` placeholders (PostgreSQL).
    Dollar,
}

impl PlaceholderStyle {
    /// Renders the placeholder for a one-based parameter position.
    #[must_use]
    pub fn render(self, position: usize) -> String {
        match self {
            Self::Question => "?".to_string(),
            Self::Dollar => format!("${position}"),
        }
    }
}

/// Storage infrastructure errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Connection could not be opened or configured.
    #[error("storage connection error: {0}")]
    Connection(String),
    /// No pooled connection became available in time.
    #[error("storage pool timeout: {0}")]
    PoolTimeout(String),
    /// Query failed to prepare or execute.
    #[error("storage query error: {0}")]
    Query(String),
    /// Lookup could not be built (invalid identifier or missing target).
    #[error("invalid storage lookup: {0}")]
    InvalidLookup(String),
}

/// Checked-out storage connection. Dropping it returns it to its pool.
pub trait StorageConnection {
    /// Executes a parameterized query and fetches every row.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] when the query fails.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError>;
}

/// Pooled storage connector.
pub trait StorageConnector: Send + Sync {
    /// Checks out a connection, waiting a bounded time.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when no connection can be acquired.
    fn acquire(&self) -> Result<Box<dyn StorageConnection + '_>, StorageError>;

    /// Returns the placeholder syntax for this backend.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }
}
