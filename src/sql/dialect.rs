//! Engine-specific SQL rules

use serde::{Deserialize, Serialize};

use crate::models::ColumnType;

/// Upper bound on bind parameters in one statement (PostgreSQL wire limit)
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// How embedded quotes are escaped inside text literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeStyle {
    /// SQL standard: `'` is doubled, backslashes are literal
    #[default]
    Standard,
    /// MySQL-compatible: `\` and `'` are backslash-escaped
    Backslash,
}

impl std::str::FromStr for EscapeStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(EscapeStyle::Standard),
            "backslash" => Ok(EscapeStyle::Backslash),
            _ => Err(format!(
                "Unknown escape style: {}. Use 'standard' or 'backslash'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for EscapeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscapeStyle::Standard => write!(f, "standard"),
            EscapeStyle::Backslash => write!(f, "backslash"),
        }
    }
}

/// SQL dialect of the connected store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    DuckDb,
    Postgres,
}

impl Dialect {
    /// Render the placeholder for the 1-based parameter `index`
    ///
    /// PostgreSQL binds typed values, so a bare `$n` is enough. DuckDB values
    /// are bound as text and cast explicitly to the column type.
    pub fn placeholder(&self, index: usize, ty: ColumnType) -> String {
        match (self, ty) {
            (Dialect::Postgres, _) | (Dialect::DuckDb, ColumnType::Text) => format!("${}", index),
            (Dialect::DuckDb, ty) => format!("CAST(${} AS {})", index, ty.sql_type()),
        }
    }

    /// Statement invoking a stored procedure
    ///
    /// `args` are already rendered literal tokens or placeholders.
    pub fn call_procedure<S: AsRef<str>>(&self, name: &str, args: &[S]) -> String {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        format!("CALL {}({})", name, args.join(", "))
    }

    /// Escape style matching the engine's string literal rules
    pub fn escape_style(&self) -> EscapeStyle {
        EscapeStyle::Standard
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::DuckDb => write!(f, "duckdb"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(3, ColumnType::Date), "$3");
        assert_eq!(Dialect::DuckDb.placeholder(1, ColumnType::Text), "$1");
        assert_eq!(
            Dialect::DuckDb.placeholder(2, ColumnType::Date),
            "CAST($2 AS DATE)"
        );
    }

    #[test]
    fn test_call_procedure() {
        let none: [&str; 0] = [];
        assert_eq!(
            Dialect::Postgres.call_procedure("usp_move_pd_stats", &none),
            "CALL usp_move_pd_stats()"
        );
        assert_eq!(
            Dialect::DuckDb.call_procedure(
                "usp_move_fund_forecasts",
                &[Dialect::DuckDb.placeholder(1, ColumnType::Date)]
            ),
            "CALL usp_move_fund_forecasts(CAST($1 AS DATE))"
        );
        assert_eq!(
            Dialect::Postgres.call_procedure("usp_move_navs", &["'2024-05-31'"]),
            "CALL usp_move_navs('2024-05-31')"
        );
    }

    #[test]
    fn test_escape_style_from_str() {
        assert_eq!(
            "Backslash".parse::<EscapeStyle>().unwrap(),
            EscapeStyle::Backslash
        );
        assert!("quoted".parse::<EscapeStyle>().is_err());
    }
}
