//! SQL text generation for staged loads
//!
//! This module turns typed [`Cell`](crate::models::Cell)s into SQL:
//! - [`literal`]: single values rendered as literal tokens (`'text'`, `12.5`, `null`)
//! - [`batch`]: rows grouped into bounded multi-row `INSERT` statements
//! - [`dialect`]: per-engine placeholder and escaping rules
//! - [`identifier`]: validation of table, column and procedure names
//!
//! Nothing here touches a database; every function is a pure function of its
//! inputs so generated statements can be compared for equality in tests.

pub mod batch;
pub mod dialect;
pub mod identifier;
pub mod literal;

pub use batch::{Batch, BatchLimits, BatchStatementBuilder, ColumnFormat, LoadMode, Param, Statement};
pub use dialect::{Dialect, EscapeStyle};
pub use identifier::validate_identifier;
pub use literal::{
    NULL_TOKEN, serialize_cell, serialize_date, serialize_number, serialize_text, unescape_text,
};

use crate::models::ColumnType;

/// Error raised while turning values into SQL
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SerializationError {
    /// A non-nullable column received no value
    #[error("Column '{column}' is required but no value was supplied")]
    MissingRequired { column: String },

    /// A value could not be converted to the column's declared type
    #[error("Column '{column}' expects a {expected} value: {reason}")]
    InvalidValue {
        column: String,
        expected: ColumnType,
        reason: String,
    },

    /// Text containing characters the store cannot hold
    #[error("Text value cannot be stored: {0}")]
    UnsupportedText(String),

    /// A date could not be rendered with the requested format
    #[error("Date format '{0}' is invalid")]
    InvalidDateFormat(String),

    /// A row does not line up with the column list
    #[error("Row {index} has {actual} cells, expected {expected}")]
    RowLength {
        index: usize,
        actual: usize,
        expected: usize,
    },

    /// A single row does not fit in one statement
    #[error("Row {index} renders to {bytes} bytes, above the {limit} byte statement limit")]
    RowTooLarge {
        index: usize,
        bytes: usize,
        limit: usize,
    },

    /// The column list cannot be bound within the parameter limit
    #[error("{columns} columns cannot be bound within a {limit} parameter statement")]
    ColumnCount { columns: usize, limit: usize },

    /// A row's scope column disagrees with the scope being published
    #[error("Row {index} has {column} = {actual}, but the publish is scoped to {expected}")]
    ScopeMismatch {
        index: usize,
        column: String,
        actual: String,
        expected: String,
    },

    /// A scope value was given for a dataset that is not scoped
    #[error("Dataset '{0}' is not scoped, but a scope value was given")]
    UnexpectedScope(String),

    /// A record could not be read as a set of named fields
    #[error("Record {index} is not a field map: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// Literals escaped in a way the connected store would misread
    #[error("Escape style '{style}' does not match how {dialect} reads string literals")]
    EscapeStyleMismatch { style: EscapeStyle, dialect: Dialect },

    /// Table, column or procedure name that is not a plain SQL identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}
