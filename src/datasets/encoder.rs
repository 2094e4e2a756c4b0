//! Generic record encoder
//!
//! Any `serde::Serialize` record is first turned into a JSON field map, then
//! each declared column reads its field and converts it to a typed [`Cell`].
//! One encoder serves every dataset; adding a dataset means adding a
//! descriptor, never a new encoder.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use super::descriptor::{ColumnSource, ColumnSpec, DatasetDescriptor};
use crate::models::{Cell, ColumnType, Row, unset_date};
use crate::sql::SerializationError;
use crate::sql::literal::serialize_cell;

/// Encodes records into rows ordered by a descriptor's columns
#[derive(Debug, Clone, Copy)]
pub struct RowEncoder<'a> {
    descriptor: &'a DatasetDescriptor,
}

impl<'a> RowEncoder<'a> {
    pub fn new(descriptor: &'a DatasetDescriptor) -> Self {
        Self { descriptor }
    }

    /// Encode one record
    ///
    /// # Arguments
    ///
    /// * `index` - Position of the record in its input, used in error messages
    /// * `record` - Any serializable value whose fields match the descriptor
    pub fn encode<R: Serialize>(&self, index: usize, record: &R) -> Result<Row, SerializationError> {
        let value = serde_json::to_value(record).map_err(|e| SerializationError::InvalidRecord {
            index,
            reason: e.to_string(),
        })?;
        self.encode_value(index, &value)
    }

    /// Encode a record that is already a JSON object
    pub fn encode_value(&self, index: usize, value: &Value) -> Result<Row, SerializationError> {
        let fields = value
            .as_object()
            .ok_or_else(|| SerializationError::InvalidRecord {
                index,
                reason: format!("expected an object, found {}", json_kind(value)),
            })?;

        self.descriptor
            .columns()
            .iter()
            .map(|column| encode_column(column, fields))
            .collect()
    }

    /// Encode every record, stopping at the first failure
    pub fn encode_all<R: Serialize>(&self, records: &[R]) -> Result<Vec<Row>, SerializationError> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| self.encode(index, record))
            .collect()
    }

    /// Check that every row carries the publish's scope value
    ///
    /// Unscoped descriptors accept any rows.
    pub fn check_scope(&self, rows: &[Row], scope: &Cell) -> Result<(), SerializationError> {
        let Some((position, column)) = self.descriptor.scope_column() else {
            return Ok(());
        };

        for (index, row) in rows.iter().enumerate() {
            let actual = row.get(position).unwrap_or(&Cell::Null);
            if actual != scope {
                return Err(SerializationError::ScopeMismatch {
                    index,
                    column: column.name.clone(),
                    actual: display_cell(actual),
                    expected: display_cell(scope),
                });
            }
        }
        Ok(())
    }
}

fn encode_column(column: &ColumnSpec, fields: &Map<String, Value>) -> Result<Cell, SerializationError> {
    let field = match &column.source {
        ColumnSource::Constant(value) => return Ok(value.clone()),
        ColumnSource::Field(field) => field,
    };

    let cell = match fields.get(field) {
        Some(value) => cell_from_json(column, value)?,
        None => Cell::Null,
    };

    match (cell, &column.default) {
        (Cell::Null, Some(default)) => Ok(default.clone()),
        (Cell::Null, None) if !column.nullable => Err(SerializationError::MissingRequired {
            column: column.name.clone(),
        }),
        (cell, _) => Ok(cell),
    }
}

/// Convert one JSON value to a cell of the column's type
///
/// `null` and, for numbers and dates, the empty string are absent values.
pub(crate) fn cell_from_json(column: &ColumnSpec, value: &Value) -> Result<Cell, SerializationError> {
    let invalid = |reason: String| SerializationError::InvalidValue {
        column: column.name.clone(),
        expected: column.ty,
        reason,
    };

    match (column.ty, value) {
        (_, Value::Null) => Ok(Cell::Null),
        (ColumnType::Number | ColumnType::Date, Value::String(s)) if s.trim().is_empty() => {
            Ok(Cell::Null)
        }

        (ColumnType::Text, Value::String(s)) => Ok(Cell::Text(s.clone())),
        (ColumnType::Text, Value::Number(n)) => Ok(Cell::Text(n.to_string())),
        (ColumnType::Text, Value::Bool(b)) => Ok(Cell::Text(b.to_string())),

        (ColumnType::Number, Value::Number(n)) => parse_decimal(&n.to_string())
            .map(Cell::Number)
            .ok_or_else(|| invalid(format!("'{}' is not a finite decimal", n))),
        (ColumnType::Number, Value::String(s)) => parse_decimal(s.trim())
            .map(Cell::Number)
            .ok_or_else(|| invalid(format!("'{}' is not a decimal number", s))),

        (ColumnType::Date, Value::String(s)) => {
            if column.zero_sentinel.as_deref() == Some(s.as_str()) {
                return Ok(Cell::Date(unset_date()));
            }
            parse_date(s.trim())
                .map(Cell::Date)
                .ok_or_else(|| invalid(format!("'{}' is not a YYYY-MM-DD date", s)))
        }

        (_, other) => Err(invalid(format!("found {}", json_kind(other)))),
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok()
                .map(|dt| dt.date())
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn display_cell(cell: &Cell) -> String {
    serialize_cell(cell, None, Default::default()).unwrap_or_else(|_| format!("{:?}", cell))
}
