//! Cell values shared by the encoder, the batch builder and the backends
//!
//! A [`Cell`] is one typed, possibly-null value destined for a staging column.
//! Rows are plain vectors of cells whose order is fixed by the owning
//! dataset descriptor.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ordered cells for one staged record
pub type Row = Vec<Cell>;

/// Tagged value for a single column of a staged row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Cell {
    /// Absent value, always rendered as the unquoted `null`
    Null,
    /// Free text
    Text(String),
    /// Fixed-point number
    Number(Decimal),
    /// Calendar date
    Date(NaiveDate),
}

impl Cell {
    /// Check whether the cell holds no value
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Convert the cell into a JSON value
    ///
    /// Numbers and dates become strings so no precision is lost; this matches
    /// the serde representation of `rust_decimal::Decimal` and `chrono::NaiveDate`,
    /// which lets typed records be rebuilt with `serde_json::from_value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Null => serde_json::Value::Null,
            Cell::Text(s) => serde_json::Value::String(s.clone()),
            Cell::Number(d) => serde_json::Value::String(d.to_string()),
            Cell::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Total digits of a stored number
pub const NUMBER_PRECISION: u32 = 28;

/// Digits after the decimal point of a stored number
pub const NUMBER_SCALE: u32 = 10;

/// Check whether a number is stored without rounding or overflow
///
/// Trailing zeros do not count against the scale.
pub fn fits_number_column(value: &Decimal) -> bool {
    let normalized = value.normalize();
    if normalized.scale() > NUMBER_SCALE {
        return false;
    }
    let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len();
    integer_digits <= (NUMBER_PRECISION - NUMBER_SCALE) as usize
}

/// Declared storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Date,
}

impl ColumnType {
    /// SQL type used when generating staging and target DDL
    ///
    /// Compatible with both DuckDB and PostgreSQL.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Number => "DECIMAL(28, 10)",
            ColumnType::Date => "DATE",
        }
    }

    /// Check whether a cell is compatible with this column type
    ///
    /// `Null` is compatible with every type; nullability is checked separately.
    pub fn accepts(&self, cell: &Cell) -> bool {
        matches!(
            (self, cell),
            (_, Cell::Null)
                | (ColumnType::Text, Cell::Text(_))
                | (ColumnType::Number, Cell::Number(_))
                | (ColumnType::Date, Cell::Date(_))
        )
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Number => write!(f, "number"),
            ColumnType::Date => write!(f, "date"),
        }
    }
}

/// Date the analytics layer uses for "never initialised" (0001-01-01)
pub fn unset_date() -> NaiveDate {
    NaiveDate::from_yo_opt(1, 1).unwrap_or(NaiveDate::MIN)
}

/// Check whether a date is the "never initialised" marker
pub fn is_unset_date(date: &NaiveDate) -> bool {
    date.year() == 1 && date.ordinal() == 1
}
