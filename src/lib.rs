//! Fund Publish - staged bulk publishing of fund-analytics snapshots
//!
//! Provides:
//! - SQL literal rendering and bounded multi-row `INSERT` generation
//! - Dataset descriptors for the standard analytics datasets
//! - Generic record encoding and read-back decoding
//! - Transactional publishing through DuckDB or PostgreSQL
//! - Configuration from `.fund-publish.toml` and the environment

#[cfg(feature = "cli")]
pub mod cli;
pub mod database;
pub mod datasets;
pub mod models;
pub mod publish;
pub mod sql;

// Re-export commonly used types
pub use database::{
    Connection, DatabaseBackend, DatabaseError, DatabaseResult, PublishConfig, QueryResult,
    TransactionError, TransactionalExecutor, open_backend,
};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDBBackend;
#[cfg(feature = "postgres-backend")]
pub use database::PostgresBackend;

pub use datasets::{
    ColumnSpec, DatasetCatalog, DatasetDescriptor, DatasetKind, DescriptorError, MoveOperation,
    RowDecoder, RowEncoder,
};
pub use models::{Cell, ColumnType, Row};
pub use publish::{
    DatasetLocks, PublishError, PublishFailure, PublishPlan, PublishReport, PublishState,
    StagingPublisher,
};
pub use sql::{BatchLimits, BatchStatementBuilder, Dialect, EscapeStyle, LoadMode, SerializationError};
