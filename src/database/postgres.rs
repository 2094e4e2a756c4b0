//! PostgreSQL database backend implementation
//!
//! The shared analytics store. The publisher is synchronous, so the backend
//! owns a tokio runtime and drives `tokio_postgres` with `block_on`; each
//! acquired connection is a fresh session whose driver task runs on that
//! runtime. Must not be called from inside another tokio runtime.

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_postgres::types::{ToSql, Type};

use super::{Connection, DatabaseBackend, DatabaseError, DatabaseResult, QueryResult};
use crate::models::{Cell, ColumnType};
use crate::sql::{Dialect, Param};

/// PostgreSQL database backend
pub struct PostgresBackend {
    connection_string: String,
    runtime: Arc<Runtime>,
}

impl PostgresBackend {
    /// Create a new PostgreSQL backend
    ///
    /// Connects once to verify the connection string.
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection string
    pub fn new(connection_string: &str) -> DatabaseResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Failed to start runtime: {}", e)))?;

        let backend = Self {
            connection_string: connection_string.to_string(),
            runtime: Arc::new(runtime),
        };
        backend.connect()?;

        tracing::info!(
            connection = %backend.connection_string_masked(),
            "Connected to PostgreSQL"
        );
        Ok(backend)
    }

    /// Get the connection string (masked for security)
    pub fn connection_string_masked(&self) -> String {
        if let Some(at_pos) = self.connection_string.find('@')
            && let Some(colon_pos) = self.connection_string[..at_pos].rfind(':')
        {
            let prefix = &self.connection_string[..colon_pos + 1];
            let suffix = &self.connection_string[at_pos..];
            return format!("{}****{}", prefix, suffix);
        }
        self.connection_string.clone()
    }

    fn connect(&self) -> DatabaseResult<PostgresConnection> {
        let (client, connection) = self
            .runtime
            .block_on(tokio_postgres::connect(
                &self.connection_string,
                tokio_postgres::NoTls,
            ))
            .map_err(|e| {
                DatabaseError::ConnectionFailed(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        self.runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(PostgresConnection {
            client,
            runtime: Arc::clone(&self.runtime),
        })
    }
}

impl DatabaseBackend for PostgresBackend {
    fn acquire(&self) -> DatabaseResult<Box<dyn Connection>> {
        Ok(Box::new(self.connect()?))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}

/// One PostgreSQL session
pub struct PostgresConnection {
    client: tokio_postgres::Client,
    runtime: Arc<Runtime>,
}

impl PostgresConnection {
    /// Typed bind values
    ///
    /// Date columns with a zero sentinel arrive as text params.
    fn bind_values(params: &[Param]) -> Vec<Box<dyn ToSql + Sync>> {
        params
            .iter()
            .map(|p| -> Box<dyn ToSql + Sync> {
                match (&p.value, p.ty) {
                    (Cell::Null, ColumnType::Text) => Box::new(None::<String>),
                    (Cell::Null, ColumnType::Number) => Box::new(None::<Decimal>),
                    (Cell::Null, ColumnType::Date) => Box::new(None::<chrono::NaiveDate>),
                    (Cell::Text(s), _) => Box::new(Some(s.clone())),
                    (Cell::Number(d), _) => Box::new(Some(*d)),
                    (Cell::Date(d), _) => Box::new(Some(*d)),
                }
            })
            .collect()
    }

    /// Convert a PostgreSQL row to a JSON value
    fn row_to_json(row: &tokio_postgres::Row) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        for (i, column) in row.columns().iter().enumerate() {
            map.insert(column.name().to_string(), Self::get_column_value(row, i, column.type_()));
        }

        serde_json::Value::Object(map)
    }

    /// Get a column value as JSON
    fn get_column_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> serde_json::Value {
        let value = match *ty {
            Type::NUMERIC => row
                .try_get::<_, Option<Decimal>>(idx)
                .ok()
                .flatten()
                .map(|d| serde_json::Value::String(d.to_string())),
            Type::DATE => row
                .try_get::<_, Option<chrono::NaiveDate>>(idx)
                .ok()
                .flatten()
                .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string())),
            Type::INT2 => row
                .try_get::<_, Option<i16>>(idx)
                .ok()
                .flatten()
                .map(|n| serde_json::Value::Number(n.into())),
            Type::INT4 => row
                .try_get::<_, Option<i32>>(idx)
                .ok()
                .flatten()
                .map(|n| serde_json::Value::Number(n.into())),
            Type::INT8 => row
                .try_get::<_, Option<i64>>(idx)
                .ok()
                .flatten()
                .map(|n| serde_json::Value::Number(n.into())),
            Type::BOOL => row
                .try_get::<_, Option<bool>>(idx)
                .ok()
                .flatten()
                .map(serde_json::Value::Bool),
            Type::FLOAT4 | Type::FLOAT8 => row
                .try_get::<_, Option<f64>>(idx)
                .ok()
                .flatten()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number),
            _ => row
                .try_get::<_, Option<String>>(idx)
                .ok()
                .flatten()
                .map(serde_json::Value::String),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

impl Connection for PostgresConnection {
    fn execute_batch(&mut self, sql: &str) -> DatabaseResult<()> {
        self.runtime
            .block_on(self.client.batch_execute(sql))
            .map_err(|e| DatabaseError::QueryFailed(format!("Batch execute failed: {}", e)))
    }

    fn execute_params(&mut self, sql: &str, params: &[Param]) -> DatabaseResult<u64> {
        let values = Self::bind_values(params);
        let refs: Vec<&(dyn ToSql + Sync)> = values
            .iter()
            .map(|v| v.as_ref() as &(dyn ToSql + Sync))
            .collect();

        self.runtime
            .block_on(self.client.execute(sql, &refs))
            .map_err(|e| DatabaseError::QueryFailed(format!("Execute failed: {}", e)))
    }

    fn query(&mut self, sql: &str, params: &[Param]) -> DatabaseResult<QueryResult> {
        let start = std::time::Instant::now();
        let values = Self::bind_values(params);
        let refs: Vec<&(dyn ToSql + Sync)> = values
            .iter()
            .map(|v| v.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = self
            .runtime
            .block_on(self.client.query(sql, &refs))
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let columns = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        Ok(QueryResult {
            columns,
            rows: rows.iter().map(Self::row_to_json).collect(),
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
