// crates/apiforge-config/src/lib.rs
// ============================================================================
// Module: apiforge Configuration
// Description: TOML configuration model, loading, and validation.
// Purpose: Resolve generation, transport, storage, and logging settings.
// Dependencies: apiforge-core, apiforge-http, apiforge-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! [`ApiforgeConfig::load`] resolves the configuration file from an explicit
//! path, the `APIFORGE_CONFIG` environment variable, or `apiforge.toml` in
//! the working directory. Files are size-limited, must be UTF-8, and are
//! validated before use. A missing default file yields the built-in
//! defaults; a missing file that was named explicitly is an error.
//!
//! `APIFORGE_BASE_URL` and `APIFORGE_DATABASE_PATH` override the transport
//! base URL and the `SQLite` database path after the file is parsed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use apiforge_core::EventSink;
use apiforge_core::ExecutionOptions;
use apiforge_core::FileEventSink;
use apiforge_core::NoopEventSink;
use apiforge_core::StderrEventSink;
use apiforge_http::HttpTransportConfig;
use apiforge_http::ReqwestTransport;
use apiforge_store_sqlite::SqliteConnector;
use apiforge_store_sqlite::SqliteConnectorConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "APIFORGE_CONFIG";
/// Environment variable overriding the HTTP base URL.
pub const BASE_URL_ENV_VAR: &str = "APIFORGE_BASE_URL";
/// Environment variable overriding the `SQLite` database path.
pub const DATABASE_PATH_ENV_VAR: &str = "APIFORGE_DATABASE_PATH";
/// Default configuration file name.
pub const DEFAULT_CONFIG_NAME: &str = "apiforge.toml";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default definition input path.
const DEFAULT_INPUT: &str = "api-definitions.json";
/// Default artifact output directory.
const DEFAULT_OUTPUT_DIR: &str = "generated";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level apiforge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiforgeConfig {
    /// Definition input and artifact output.
    #[serde(default)]
    pub generation: GenerationConfig,
    /// HTTP transport used by live runs.
    #[serde(default)]
    pub http: Option<HttpTransportConfig>,
    /// `SQLite` storage used by storage rules.
    #[serde(default)]
    pub storage: Option<SqliteConnectorConfig>,
    /// Event sink selection.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Case execution settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Definition file (JSON or YAML).
    #[serde(default = "default_input")]
    pub input: PathBuf,
    /// Root directory for emitted artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output_dir: default_output_dir(),
        }
    }
}

/// Serde default for `generation.input`.
fn default_input() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT)
}

/// Serde default for `generation.output_dir`.
fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Event sink kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
    /// Discard events.
    None,
}

/// Logging settings.
///
/// # Invariants
/// - `path` is required when `sink = "file"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Execution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Response field compared against a case's `messageKey`.
    #[serde(default)]
    pub message_field: Option<String>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ApiforgeConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| env::var(name).ok())
    }

    /// Loads configuration with an injected environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (resolved, explicit) = resolve_path(path, &lookup)?;
        validate_path(&resolved)?;
        let mut config = if !explicit && !resolved.exists() {
            Self::default()
        } else {
            Self::from_file(&resolved)?
        };
        config.apply_env(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text does not parse or validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides.
    fn apply_env<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV_VAR).filter(|value| !value.trim().is_empty()) {
            match self.http.as_mut() {
                Some(http) => http.base_url = base_url,
                None => self.http = Some(HttpTransportConfig::new(base_url)),
            }
        }
        if let Some(path) = lookup(DATABASE_PATH_ENV_VAR).filter(|value| !value.trim().is_empty())
        {
            match self.storage.as_mut() {
                Some(storage) => storage.path = PathBuf::from(path),
                None => self.storage = Some(SqliteConnectorConfig::new(path)),
            }
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.generation.input.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("generation.input must be non-empty".to_string()));
        }
        if self.generation.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "generation.output_dir must be non-empty".to_string(),
            ));
        }
        if let Some(http) = &self.http {
            if http.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid("http.base_url must be non-empty".to_string()));
            }
            if http.timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "http.timeout_ms must be greater than zero".to_string(),
                ));
            }
            if http.max_response_bytes == 0 {
                return Err(ConfigError::Invalid(
                    "http.max_response_bytes must be greater than zero".to_string(),
                ));
            }
        }
        if let Some(storage) = &self.storage {
            if storage.path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("storage.path must be non-empty".to_string()));
            }
            if storage.pool_size == 0 {
                return Err(ConfigError::Invalid(
                    "storage.pool_size must be greater than zero".to_string(),
                ));
            }
        }
        if self.logging.sink == LogSinkKind::File && self.logging.path.is_none() {
            return Err(ConfigError::Invalid(
                "logging.path is required when logging.sink = \"file\"".to_string(),
            ));
        }
        if let Some(field) = &self.execution.message_field
            && field.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "execution.message_field must be non-empty when set".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

impl ApiforgeConfig {
    /// Builds the configured event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the log file cannot be opened.
    pub fn event_sink(&self) -> Result<Box<dyn EventSink>, ConfigError> {
        match self.logging.sink {
            LogSinkKind::Stderr => Ok(Box::new(StderrEventSink)),
            LogSinkKind::None => Ok(Box::new(NoopEventSink)),
            LogSinkKind::File => {
                let path = self.logging.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("logging.path is required for the file sink".to_string())
                })?;
                let sink = FileEventSink::new(path)
                    .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
                Ok(Box::new(sink))
            }
        }
    }

    /// Builds the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no base URL is configured or the
    /// transport rejects it.
    pub fn http_transport(&self) -> Result<ReqwestTransport, ConfigError> {
        let http = self.http.as_ref().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "http.base_url is required for live runs (or set {BASE_URL_ENV_VAR})"
            ))
        })?;
        ReqwestTransport::new(http).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Opens the storage connector when storage is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the pool cannot be opened.
    pub fn storage_connector(&self) -> Result<Option<SqliteConnector>, ConfigError> {
        self.storage
            .as_ref()
            .map(|storage| {
                SqliteConnector::open(storage).map_err(|err| ConfigError::Invalid(err.to_string()))
            })
            .transpose()
    }

    /// Returns executor options derived from this configuration.
    #[must_use]
    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            message_field: self.execution.message_field.clone(),
            headers: std::collections::BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path and whether it was named explicitly.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<(PathBuf, bool), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
