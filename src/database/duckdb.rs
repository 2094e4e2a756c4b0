//! DuckDB database backend implementation
//!
//! Provides an embedded backend for local runs and tests. Every acquired
//! connection is a clone of the backend's root connection, so all of them
//! see the same database, in-memory ones included.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Connection, DatabaseBackend, DatabaseError, DatabaseResult, QueryResult};
use crate::models::Cell;
use crate::sql::{Dialect, Param};

/// Path value that opens an in-memory database
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Days from 0001-01-01 (CE day 1) to the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// DuckDB database backend
pub struct DuckDBBackend {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// Root connection that acquired connections are cloned from
    connection: Mutex<duckdb::Connection>,
}

impl DuckDBBackend {
    /// Create a new DuckDB backend with a file-based database
    ///
    /// # Arguments
    /// * `db_path` - Path to the DuckDB database file, or `:memory:`
    pub fn new(db_path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = db_path.as_ref();
        if path == Path::new(IN_MEMORY_PATH) {
            return Self::in_memory();
        }

        let connection = duckdb::Connection::open(path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: Some(path.to_path_buf()),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory DuckDB backend
    pub fn in_memory() -> DatabaseResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check if this is an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }
}

impl DatabaseBackend for DuckDBBackend {
    fn acquire(&self) -> DatabaseResult<Box<dyn Connection>> {
        let root = self
            .connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))?;

        let conn = root.try_clone().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open DuckDB connection: {}", e))
        })?;

        Ok(Box::new(DuckDBConnection { conn }))
    }

    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }
}

/// One DuckDB connection
pub struct DuckDBConnection {
    conn: duckdb::Connection,
}

impl DuckDBConnection {
    /// Bind values as text; placeholders cast them to the column type
    fn bind_values(params: &[Param]) -> Vec<duckdb::types::Value> {
        use duckdb::types::Value;

        params
            .iter()
            .map(|p| match &p.value {
                Cell::Null => Value::Null,
                Cell::Text(s) => Value::Text(s.clone()),
                Cell::Number(d) => Value::Text(d.to_string()),
                Cell::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
            })
            .collect()
    }

    /// Convert a DuckDB row to a JSON value
    fn row_to_json(row: &duckdb::Row, columns: &[String]) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        for (i, col_name) in columns.iter().enumerate() {
            let value = match row.get_ref(i) {
                Ok(value_ref) => Self::value_ref_to_json(value_ref),
                Err(_) => serde_json::Value::Null,
            };
            map.insert(col_name.clone(), value);
        }

        serde_json::Value::Object(map)
    }

    /// Convert a DuckDB ValueRef to a JSON value
    ///
    /// Decimals and dates become strings so they read back without loss.
    fn value_ref_to_json(value: duckdb::types::ValueRef) -> serde_json::Value {
        use duckdb::types::ValueRef;

        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Boolean(b) => serde_json::Value::Bool(b),
            ValueRef::TinyInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::SmallInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::Int(i) => serde_json::Value::Number(i.into()),
            ValueRef::BigInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::HugeInt(i) => serde_json::Value::String(i.to_string()),
            ValueRef::UTinyInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::USmallInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::UInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::UBigInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Double(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Decimal(d) => serde_json::Value::String(d.to_string()),
            ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
            ValueRef::Blob(bytes) => {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            ValueRef::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
                .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(serde_json::Value::Null),
            other => serde_json::Value::String(format!("{:?}", other)),
        }
    }
}

impl Connection for DuckDBConnection {
    fn execute_batch(&mut self, sql: &str) -> DatabaseResult<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Batch execute failed: {}", e)))
    }

    fn execute_params(&mut self, sql: &str, params: &[Param]) -> DatabaseResult<u64> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let values = Self::bind_values(params);
        let affected = stmt
            .execute(duckdb::params_from_iter(values.iter()))
            .map_err(|e| DatabaseError::QueryFailed(format!("Execute failed: {}", e)))?;

        Ok(affected as u64)
    }

    fn query(&mut self, sql: &str, params: &[Param]) -> DatabaseResult<QueryResult> {
        let start = std::time::Instant::now();

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let values = Self::bind_values(params);

        // Columns are only known once the query has run
        let mut result_rows = stmt
            .query(duckdb::params_from_iter(values.iter()))
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = result_rows
            .next()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            rows.push(Self::row_to_json(row, &columns));
        }

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
