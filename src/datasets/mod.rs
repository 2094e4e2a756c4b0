//! Dataset descriptors and record encoding
//!
//! Each publishable dataset is described once by a [`DatasetDescriptor`].
//! The generic [`RowEncoder`] turns any serializable record into an ordered
//! row for that descriptor, and [`RowDecoder`] reads staged rows back into
//! records. The [`DatasetCatalog`] holds the standard fund-analytics
//! datasets plus any configured overrides.

pub mod catalog;
pub mod decoder;
pub mod descriptor;
pub mod encoder;
pub mod schema;

pub use catalog::{DatasetCatalog, DatasetKind};
pub use decoder::RowDecoder;
pub use descriptor::{
    ColumnSource, ColumnSpec, DatasetDescriptor, DatasetDescriptorBuilder, MoveOperation, ScopeKey,
};
pub use encoder::RowEncoder;
pub use schema::DatasetSchema;

use crate::sql::SerializationError;

/// Error raised when a dataset descriptor is malformed or misused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error(transparent)]
    Identifier(#[from] SerializationError),

    #[error("Dataset '{0}' has no staging table")]
    MissingStagingTable(String),

    #[error("Dataset '{0}' has no move operation")]
    MissingMoveOperation(String),

    #[error("Dataset '{0}' declares no columns")]
    NoColumns(String),

    #[error("Column '{0}' is declared twice")]
    DuplicateColumn(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Scope column '{0}' must be required")]
    NullableScope(String),

    #[error("Dataset '{0}' upserts without key columns")]
    NoKeyColumns(String),

    #[error("Invalid value for column '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),
}
