//! Identifier validation
//!
//! Table, column and procedure names are spliced into statement text, so they
//! are restricted to plain (optionally schema-qualified) identifiers.

use once_cell::sync::Lazy;
use regex::Regex;

use super::SerializationError;

static RE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("Invalid regex")
});

/// Maximum identifier length accepted (PostgreSQL truncates at 63 per segment)
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate a table, column or procedure name
///
/// Accepts `name` and `schema.name` forms made of ASCII letters, digits and
/// underscores, not starting with a digit.
pub fn validate_identifier(name: &str) -> Result<(), SerializationError> {
    if name.len() > MAX_IDENTIFIER_LENGTH || !RE_IDENTIFIER.is_match(name) {
        return Err(SerializationError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("fund_forecasts").is_ok());
        assert!(validate_identifier("staging.fund_forecasts").is_ok());
        assert!(validate_identifier("_tmp1").is_ok());
    }

    #[test]
    fn test_invalid_identifiers() {
        for bad in [
            "",
            "1table",
            "staging.",
            "fund forecasts",
            "x; DROP TABLE y",
            "a'b",
            "schema..table",
        ] {
            assert!(validate_identifier(bad).is_err(), "{bad} should be rejected");
        }
        assert!(validate_identifier(&"a".repeat(200)).is_err());
    }
}
