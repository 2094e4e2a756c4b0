//! Literal value rendering
//!
//! Converts one optional value into the SQL token spliced into an `INSERT`
//! statement. Absent values are always the unquoted `null`; text and dates
//! are single-quoted with embedded quotes escaped; numbers are rendered in
//! fixed-point notation with no locale-dependent separators.

use std::fmt::Write;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::SerializationError;
use super::dialect::EscapeStyle;
use crate::models::{Cell, is_unset_date};

/// Token used for every absent value
pub const NULL_TOKEN: &str = "null";

/// Default date rendering (`YYYY-MM-DD`)
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Render optional text as a quoted, escaped literal
///
/// # Errors
///
/// Text containing a NUL character cannot be stored by either supported
/// engine and is rejected.
pub fn serialize_text(value: Option<&str>, style: EscapeStyle) -> Result<String, SerializationError> {
    match value {
        None => Ok(NULL_TOKEN.to_string()),
        Some(text) => quote(text, style),
    }
}

/// Render an optional number as an unquoted fixed-point literal
///
/// `Decimal`'s `Display` never uses exponent notation or grouping and keeps the
/// value's own scale, so `1.50` stays `1.50` and `-0.015` stays `-0.015`.
pub fn serialize_number(value: Option<&Decimal>) -> String {
    match value {
        None => NULL_TOKEN.to_string(),
        Some(number) => number.to_string(),
    }
}

/// Render an optional date as a quoted literal
///
/// # Arguments
///
/// * `value` - Date to render
/// * `format` - `chrono` format string, normally [`ISO_DATE_FORMAT`]
/// * `zero_sentinel` - Literal used in place of the "never set" date (0001-01-01)
/// * `style` - Escape style applied to the rendered text
pub fn serialize_date(
    value: Option<&NaiveDate>,
    format: &str,
    zero_sentinel: Option<&str>,
    style: EscapeStyle,
) -> Result<String, SerializationError> {
    let Some(date) = value else {
        return Ok(NULL_TOKEN.to_string());
    };

    if let Some(sentinel) = zero_sentinel
        && is_unset_date(date)
    {
        return quote(sentinel, style);
    }

    let mut rendered = String::new();
    write!(rendered, "{}", date.format(format))
        .map_err(|_| SerializationError::InvalidDateFormat(format.to_string()))?;
    quote(&rendered, style)
}

/// Render a cell with the default ISO date format
pub fn serialize_cell(
    cell: &Cell,
    zero_sentinel: Option<&str>,
    style: EscapeStyle,
) -> Result<String, SerializationError> {
    match cell {
        Cell::Null => Ok(NULL_TOKEN.to_string()),
        Cell::Text(s) => serialize_text(Some(s), style),
        Cell::Number(d) => Ok(serialize_number(Some(d))),
        Cell::Date(d) => serialize_date(Some(d), ISO_DATE_FORMAT, zero_sentinel, style),
    }
}

/// Reverse [`serialize_text`]
///
/// Returns `None` for the `null` token, and also for tokens that are not a
/// well-formed quoted literal in the given style.
pub fn unescape_text(token: &str, style: EscapeStyle) -> Option<String> {
    let inner = token.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match (style, c) {
            (EscapeStyle::Standard, '\'') => {
                if chars.next()? != '\'' {
                    return None;
                }
                out.push('\'');
            }
            (EscapeStyle::Backslash, '\\') => out.push(chars.next()?),
            (EscapeStyle::Backslash, '\'') => return None,
            _ => out.push(c),
        }
    }

    Some(out)
}

fn quote(text: &str, style: EscapeStyle) -> Result<String, SerializationError> {
    if text.contains('\0') {
        return Err(SerializationError::UnsupportedText(
            "NUL characters are not allowed".to_string(),
        ));
    }

    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match (style, c) {
            (EscapeStyle::Standard, '\'') => out.push_str("''"),
            (EscapeStyle::Backslash, '\'') => out.push_str("\\'"),
            (EscapeStyle::Backslash, '\\') => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    Ok(out)
}
