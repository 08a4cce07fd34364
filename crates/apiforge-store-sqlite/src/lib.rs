// crates/apiforge-store-sqlite/src/lib.rs
// ============================================================================
// Module: apiforge SQLite Connector
// Description: Pooled SQLite implementation of the storage connector trait.
// Purpose: Run storage validation lookups against a SQLite database.
// Dependencies: apiforge-core, base64, rusqlite, serde, serde_json
// ============================================================================

//! ## Overview
//! [`SqliteConnector`] opens a fixed number of connections up front and lends
//! them out through [`StorageConnector::acquire`]. A checked-out connection is
//! returned to the pool when its guard drops, including on error and unwind.
//! Acquisition waits at most `acquire_timeout_ms` for a free connection.
//!
//! JSON parameters bind as native `SQLite` values (booleans as `0`/`1`,
//! arrays and objects as JSON text). Result columns map back to JSON; blobs
//! are base64 text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Condvar;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use apiforge_core::Row;
use apiforge_core::StorageConnection;
use apiforge_core::StorageConnector;
use apiforge_core::StorageError;
use base64::Engine;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::types::Value as SqlValue;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Default bounded wait for a free connection, in milliseconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

/// Default `SQLite` busy timeout, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// `SQLite` connector configuration.
///
/// # Invariants
/// - `pool_size` must be greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteConnectorConfig {
    /// Database file path.
    pub path: PathBuf,
    /// Number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Bounded wait for a free connection.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// `SQLite` busy timeout.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Open connections read-only.
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

impl SqliteConnectorConfig {
    /// Creates a read-only configuration with defaults for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            read_only: true,
        }
    }
}

/// Serde default for `pool_size`.
const fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

/// Serde default for `acquire_timeout_ms`.
const fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_MS
}

/// Serde default for `busy_timeout_ms`.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Serde default for `read_only`.
const fn default_read_only() -> bool {
    true
}

// ============================================================================
// SECTION: Pool
// ============================================================================

/// Fixed-size `SQLite` connection pool.
pub struct SqliteConnector {
    /// Idle connections.
    idle: Mutex<Vec<Connection>>,
    /// Signalled when a connection is returned.
    available: Condvar,
    /// Bounded acquisition wait.
    acquire_timeout: Duration,
}

impl SqliteConnector {
    /// Opens every pooled connection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] when the pool size is zero or a
    /// connection cannot be opened or configured.
    pub fn open(config: &SqliteConnectorConfig) -> Result<Self, StorageError> {
        if config.pool_size == 0 {
            return Err(StorageError::Connection("pool_size must be greater than zero".to_string()));
        }
        let mut connections = Vec::with_capacity(config.pool_size);
        for _ in 0 .. config.pool_size {
            connections.push(open_connection(config)?);
        }
        Ok(Self {
            idle: Mutex::new(connections),
            available: Condvar::new(),
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
        })
    }

    /// Returns the number of idle connections.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map_or(0, |idle| idle.len())
    }

    /// Returns a connection to the pool.
    fn release(&self, connection: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(connection);
            self.available.notify_one();
        }
    }
}

impl StorageConnector for SqliteConnector {
    fn acquire(&self) -> Result<Box<dyn StorageConnection + '_>, StorageError> {
        let poisoned = |_| StorageError::Connection("connection pool lock poisoned".to_string());
        let deadline = Instant::now() + self.acquire_timeout;
        let mut idle = self.idle.lock().map_err(poisoned)?;
        loop {
            if let Some(connection) = idle.pop() {
                return Ok(Box::new(PooledConnection {
                    pool: self,
                    connection: Some(connection),
                }));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StorageError::PoolTimeout(format!(
                    "no connection available within {} ms",
                    self.acquire_timeout.as_millis()
                )));
            }
            let (guard, _) = self.available.wait_timeout(idle, deadline - now).map_err(|_| {
                StorageError::Connection("connection pool lock poisoned".to_string())
            })?;
            idle = guard;
        }
    }
}

/// Checked-out connection; returns itself to the pool on drop.
struct PooledConnection<'a> {
    /// Owning pool.
    pool: &'a SqliteConnector,
    /// Connection, present until drop.
    connection: Option<Connection>,
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.release(connection);
        }
    }
}

impl StorageConnection for PooledConnection<'_> {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| StorageError::Connection("connection already released".to_string()))?;
        let mut statement =
            connection.prepare(sql).map_err(|err| StorageError::Query(err.to_string()))?;
        let columns: Vec<String> =
            statement.column_names().into_iter().map(str::to_string).collect();
        let bound: Vec<SqlValue> = params.iter().map(to_sql_value).collect();
        let mut rows = statement
            .query(rusqlite::params_from_iter(bound.iter()))
            .map_err(|err| StorageError::Query(err.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|err| StorageError::Query(err.to_string()))? {
            let mut record = Row::new();
            for (index, column) in columns.iter().enumerate() {
                let value = row.get_ref(index).map_err(|err| StorageError::Query(err.to_string()))?;
                record.insert(column.clone(), from_sql_value(value));
            }
            out.push(record);
        }
        Ok(out)
    }
}

// ============================================================================
// SECTION: Connections
// ============================================================================

/// Opens one connection with pragmas applied.
fn open_connection(config: &SqliteConnectorConfig) -> Result<Connection, StorageError> {
    let access = if config.read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    };
    let flags = access | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(|err| {
        StorageError::Connection(format!("{}: {err}", config.path.display()))
    })?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| StorageError::Connection(err.to_string()))?;
    Ok(connection)
}

// ============================================================================
// SECTION: Value Mapping
// ============================================================================

/// Converts a JSON parameter into a `SQLite` value.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => number.as_i64().map_or_else(
            || SqlValue::Real(number.as_f64().unwrap_or_default()),
            SqlValue::Integer,
        ),
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Converts a `SQLite` column value into JSON.
fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(number) => Value::from(number),
        ValueRef::Real(number) => {
            serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
        }
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
    }
}
