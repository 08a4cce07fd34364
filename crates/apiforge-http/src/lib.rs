// crates/apiforge-http/src/lib.rs
// ============================================================================
// Module: apiforge HTTP Transport
// Description: Blocking reqwest implementation of the HTTP transport trait.
// Purpose: Issue generated-case requests with timeouts and size limits.
// Dependencies: apiforge-core, reqwest, serde, serde_json, url
// ============================================================================

//! ## Overview
//! [`ReqwestTransport`] sends [`HttpRequest`]s relative to a configured base
//! URL. Redirects are never followed so the status a case asserts is the
//! status the endpoint returned. Bodies are read up to a byte limit; an
//! oversized response is a transport error rather than a truncated body.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use apiforge_core::HttpRequest;
use apiforge_core::HttpResponse;
use apiforge_core::HttpTransport;
use apiforge_core::TransportError;
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default response size limit in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpTransportConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Headers added to every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl HttpTransportConfig {
    /// Creates a configuration with defaults for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
        }
    }
}

/// Serde default for `timeout_ms`.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Serde default for `max_response_bytes`.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Serde default for `user_agent`.
fn default_user_agent() -> String {
    format!("apiforge/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Blocking HTTP transport backed by reqwest.
pub struct ReqwestTransport {
    /// Parsed base URL.
    base_url: Url,
    /// Shared HTTP client.
    client: Client,
    /// Response size limit.
    max_response_bytes: usize,
    /// Default headers.
    headers: BTreeMap<String, String>,
}

impl ReqwestTransport {
    /// Builds a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] for a malformed base URL and
    /// [`TransportError::Request`] when the client cannot be built.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| TransportError::InvalidUrl(format!("{}: {err}", config.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme `{}`",
                base_url.scheme()
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::Request(format!("http client build failed: {err}")))?;
        Ok(Self {
            base_url,
            client,
            max_response_bytes: config.max_response_bytes,
            headers: config.headers.clone(),
        })
    }

    /// Returns the absolute URL for a request.
    fn url_for(&self, request: &HttpRequest) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path_and_query = request.path_and_query();
        let separator = if path_and_query.starts_with('/') { "" } else { "/" };
        let raw = format!("{base}{separator}{path_and_query}");
        Url::parse(&raw).map_err(|err| TransportError::InvalidUrl(format!("{raw}: {err}")))
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(request)?;
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let mut builder = self.client.request(method, url).header(ACCEPT, "application/json");
        for (name, value) in self.headers.iter().chain(request.headers.iter()) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|err| TransportError::Request(format!("body encoding failed: {err}")))?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }
        let mut response = builder.send().map_err(|err| {
            if err.is_timeout() {
                TransportError::Request(format!("request timed out: {err}"))
            } else {
                TransportError::Request(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let bytes = read_response_limited(&mut response, self.max_response_bytes)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(HttpResponse::from_text(status, headers, text))
    }
}

/// Reads a response body, failing once it exceeds `max_bytes`.
fn read_response_limited(
    response: &mut reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, TransportError> {
    let too_large = || TransportError::ResponseTooLarge {
        limit: max_bytes,
    };
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| too_large())?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(too_large());
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| TransportError::Request(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(too_large());
    }
    Ok(buf)
}
