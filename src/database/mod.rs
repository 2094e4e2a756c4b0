//! Database backend abstraction for staged publishing
//!
//! This module provides the connection layer the publisher runs on:
//! - DuckDB: embedded database, used by default and in tests
//! - PostgreSQL: the shared analytics store in server deployments
//!
//! Backends hand out exclusive [`Connection`]s; the
//! [`TransactionalExecutor`] wraps each unit of work in one transaction on
//! one of them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub mod config;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDBBackend;

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresBackend;

pub use config::{BackendKind, DatasetOverride, PublishConfig};
pub use transaction::{Transaction, TransactionError, TransactionalExecutor};

use crate::datasets::{DatasetCatalog, DatasetSchema};
use crate::sql::{Dialect, Param, Statement};

/// Error type for database operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin, commit or rollback failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A value could not be bound or read back
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Query result row as a JSON value keyed by column name
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One exclusive session with the store
///
/// A connection is used by a single publish at a time and released when
/// dropped.
pub trait Connection: Send {
    /// Execute one or more statements without parameters
    fn execute_batch(&mut self, sql: &str) -> DatabaseResult<()>;

    /// Execute a single statement with bound parameters
    ///
    /// # Returns
    /// Number of rows affected
    fn execute_params(&mut self, sql: &str, params: &[Param]) -> DatabaseResult<u64>;

    /// Run a query and collect its rows
    fn query(&mut self, sql: &str, params: &[Param]) -> DatabaseResult<QueryResult>;

    /// Open a transaction
    fn begin(&mut self) -> DatabaseResult<()> {
        self.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DatabaseError::TransactionFailed(format!("Begin failed: {}", e)))
    }

    /// Commit the open transaction
    fn commit(&mut self) -> DatabaseResult<()> {
        self.execute_batch("COMMIT")
            .map_err(|e| DatabaseError::TransactionFailed(format!("Commit failed: {}", e)))
    }

    /// Roll back the open transaction
    fn rollback(&mut self) -> DatabaseResult<()> {
        self.execute_batch("ROLLBACK")
            .map_err(|e| DatabaseError::TransactionFailed(format!("Rollback failed: {}", e)))
    }

    /// Execute a generated statement
    fn execute_statement(&mut self, statement: &Statement) -> DatabaseResult<u64> {
        self.execute_params(statement.sql(), statement.params())
    }
}

/// Database backend handing out connections
pub trait DatabaseBackend: Send + Sync {
    /// Open (or check out) a connection
    fn acquire(&self) -> DatabaseResult<Box<dyn Connection>>;

    /// SQL dialect spoken by the backend
    fn dialect(&self) -> Dialect;

    /// Backend type string ("duckdb" or "postgres")
    fn backend_type(&self) -> &'static str;

    /// Create staging and target tables for every dataset in the catalog
    fn initialize(&self, catalog: &DatasetCatalog) -> DatabaseResult<()> {
        let mut conn = self.acquire()?;
        conn.execute_batch(&DatasetSchema::create_all_sql(catalog))
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to create tables: {}", e)))
    }

    /// Check that the store answers queries
    fn health_check(&self) -> DatabaseResult<bool> {
        let mut conn = self.acquire()?;
        let result = conn.query("SELECT 1 AS healthy", &[])?;
        Ok(!result.is_empty())
    }
}

/// Open the backend selected by configuration
///
/// # Errors
///
/// Returns `ConfigError` when the selected backend was not compiled in.
pub fn open_backend(config: &PublishConfig) -> DatabaseResult<Arc<dyn DatabaseBackend>> {
    match config.database.backend {
        #[cfg(feature = "duckdb-backend")]
        BackendKind::DuckDb => {
            let backend = match &config.database.path {
                Some(path) => DuckDBBackend::new(path)?,
                None => DuckDBBackend::in_memory()?,
            };
            Ok(Arc::new(backend))
        }
        #[cfg(feature = "postgres-backend")]
        BackendKind::Postgres => {
            let connection_string = config.postgres.connection_string.as_deref().ok_or_else(|| {
                DatabaseError::ConfigError(
                    "PostgreSQL backend selected but no connection_string configured".to_string(),
                )
            })?;
            Ok(Arc::new(PostgresBackend::new(connection_string)?))
        }
        #[allow(unreachable_patterns)]
        other => Err(DatabaseError::ConfigError(format!(
            "Backend '{}' is not enabled in this build",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
    }

    #[test]
    fn test_query_result_rows() {
        let result = QueryResult::new(
            vec!["ticker".to_string()],
            vec![serde_json::json!({"ticker": "ABC"})],
        );
        assert_eq!(result.row_count(), 1);
    }

    #[cfg(feature = "duckdb-backend")]
    #[test]
    fn test_open_default_backend() {
        let config = PublishConfig {
            database: config::DatabaseSettings {
                backend: BackendKind::DuckDb,
                path: None,
            },
            ..Default::default()
        };
        let backend = open_backend(&config).unwrap();
        assert_eq!(backend.backend_type(), "duckdb");
        assert!(backend.health_check().unwrap());
    }
}
