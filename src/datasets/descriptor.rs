//! Dataset descriptors
//!
//! A [`DatasetDescriptor`] declares everything the publisher needs to know
//! about one dataset: the staging table, the ordered column schema, the
//! optional scope key used when clearing staging, and the server-side
//! operation that promotes staged rows. Descriptors are validated once when
//! built and never change afterwards.

use serde::{Deserialize, Serialize};

use super::DescriptorError;
use crate::models::{Cell, ColumnType};
use crate::sql::literal::serialize_cell;
use crate::sql::identifier::validate_identifier;
use crate::sql::{
    BatchStatementBuilder, ColumnFormat, Dialect, EscapeStyle, LoadMode, Param, SerializationError,
    Statement,
};

/// Where a column's value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    /// Named field of the input record
    Field(String),
    /// Same value for every row (e.g. a `source` tag)
    Constant(Cell),
}

/// One staged column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name in the staging table
    pub name: String,
    pub source: ColumnSource,
    pub ty: ColumnType,
    /// Whether `null` may be staged (default: true)
    pub nullable: bool,
    /// Value used when the record has no value for the field
    pub default: Option<Cell>,
    /// Literal for the "never set" date (date columns only)
    pub zero_sentinel: Option<String>,
}

impl ColumnSpec {
    /// Create a nullable column read from the record field of the same name
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        let name = name.into();
        Self {
            source: ColumnSource::Field(name.clone()),
            name,
            ty,
            nullable: true,
            default: None,
            zero_sentinel: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Number)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Date)
    }

    /// Create a column holding the same value on every row
    pub fn constant(name: impl Into<String>, ty: ColumnType, value: Cell) -> Self {
        Self {
            name: name.into(),
            source: ColumnSource::Constant(value),
            ty,
            nullable: false,
            default: None,
            zero_sentinel: None,
        }
    }

    /// Mark the column as non-nullable
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Read the value from a differently named record field
    pub fn from_field(mut self, field: impl Into<String>) -> Self {
        self.source = ColumnSource::Field(field.into());
        self
    }

    /// Value staged when the record has none
    pub fn with_default(mut self, value: Cell) -> Self {
        self.default = Some(value);
        self
    }

    /// Literal written for the "never set" date
    pub fn with_zero_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.zero_sentinel = Some(sentinel.into());
        self
    }

    /// Record field the column reads, if any
    pub fn field(&self) -> Option<&str> {
        match &self.source {
            ColumnSource::Field(field) => Some(field),
            ColumnSource::Constant(_) => None,
        }
    }

    /// Type the column is stored as in staging and target tables
    pub fn storage_type(&self) -> ColumnType {
        self.format().storage_type()
    }

    fn format(&self) -> ColumnFormat<'_> {
        ColumnFormat {
            name: &self.name,
            ty: self.ty,
            zero_sentinel: self.zero_sentinel.as_deref(),
        }
    }
}

/// Column that partitions staging by publish (e.g. an effective date)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeKey {
    pub column: String,
}

/// Server-side operation promoting staged rows into the table consumers read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveOperation {
    /// Stored procedure, optionally called with the scope value
    Procedure { name: String, pass_scope: bool },
    /// Replace the target's scope (or whole table) with the staged rows
    Replace { target: String },
    /// Replace target rows whose key matches a staged row, insert the rest
    Upsert {
        target: String,
        key_columns: Vec<String>,
    },
}

impl MoveOperation {
    /// Table the operation writes, when it is known
    pub fn target_table(&self) -> Option<&str> {
        match self {
            MoveOperation::Procedure { .. } => None,
            MoveOperation::Replace { target } | MoveOperation::Upsert { target, .. } => Some(target),
        }
    }
}

impl std::fmt::Display for MoveOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveOperation::Procedure { name, .. } => write!(f, "procedure {}", name),
            MoveOperation::Replace { target } => write!(f, "replace into {}", target),
            MoveOperation::Upsert {
                target,
                key_columns,
            } => write!(f, "upsert into {} on ({})", target, key_columns.join(", ")),
        }
    }
}

/// Immutable description of one publishable dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDescriptor {
    name: String,
    staging_table: String,
    columns: Vec<ColumnSpec>,
    scope: Option<ScopeKey>,
    move_operation: MoveOperation,
}

impl DatasetDescriptor {
    /// Start building a descriptor
    pub fn builder(name: impl Into<String>) -> DatasetDescriptorBuilder {
        DatasetDescriptorBuilder {
            name: name.into(),
            staging_table: None,
            columns: Vec::new(),
            scope: None,
            move_operation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn staging_table(&self) -> &str {
        &self.staging_table
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn scope(&self) -> Option<&ScopeKey> {
        self.scope.as_ref()
    }

    pub fn move_operation(&self) -> &MoveOperation {
        &self.move_operation
    }

    /// Position and spec of the scope column
    pub fn scope_column(&self) -> Option<(usize, &ColumnSpec)> {
        let key = self.scope.as_ref()?;
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == key.column)
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Statement builder over this dataset's staging table
    pub fn statement_builder(&self) -> BatchStatementBuilder<'_> {
        BatchStatementBuilder::new(
            &self.staging_table,
            self.columns.iter().map(ColumnSpec::format).collect(),
        )
    }

    /// Copy of this descriptor with a different staging table
    pub fn with_staging_table(&self, table: &str) -> Result<Self, DescriptorError> {
        let mut copy = self.clone();
        copy.staging_table = table.to_string();
        copy.validate()?;
        Ok(copy)
    }

    /// Copy of this descriptor with a different move operation
    pub fn with_move_operation(&self, operation: MoveOperation) -> Result<Self, DescriptorError> {
        let mut copy = self.clone();
        copy.move_operation = operation;
        copy.validate()?;
        Ok(copy)
    }

    /// Statement removing this publish's rows from staging
    ///
    /// Unscoped datasets clear the whole staging table.
    pub fn clear_statement(
        &self,
        scope: Option<&Cell>,
        mode: LoadMode,
        dialect: Dialect,
        style: EscapeStyle,
    ) -> Result<Statement, SerializationError> {
        let mut sql = format!("DELETE FROM {}", self.staging_table);
        let mut params = Vec::new();

        if let Some((_, column)) = self.scope_column() {
            let value = self.scope_reference(scope, mode, dialect, style, &mut params)?;
            sql.push_str(&format!(" WHERE {} = {}", column.name, value));
        }

        Ok(finish(sql, params, mode))
    }

    /// Statements promoting staged rows, in execution order
    pub fn move_statements(
        &self,
        scope: Option<&Cell>,
        mode: LoadMode,
        dialect: Dialect,
        style: EscapeStyle,
    ) -> Result<Vec<Statement>, SerializationError> {
        let column_list = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        match &self.move_operation {
            MoveOperation::Procedure { name, pass_scope } => {
                let mut params = Vec::new();
                let mut args = Vec::new();
                if *pass_scope && self.scope_column().is_some() {
                    args.push(self.scope_reference(scope, mode, dialect, style, &mut params)?);
                }
                let sql = dialect.call_procedure(name, &args);
                Ok(vec![finish(sql, params, mode)])
            }
            MoveOperation::Replace { target } => {
                let mut delete_params = Vec::new();
                let mut insert_params = Vec::new();
                let (delete, insert) = match self.scope_column() {
                    Some((_, column)) => {
                        let d = self.scope_reference(scope, mode, dialect, style, &mut delete_params)?;
                        let i = self.scope_reference(scope, mode, dialect, style, &mut insert_params)?;
                        (
                            format!("DELETE FROM {} WHERE {} = {}", target, column.name, d),
                            format!(
                                "INSERT INTO {} ({}) SELECT {} FROM {} WHERE {} = {}",
                                target, column_list, column_list, self.staging_table, column.name, i
                            ),
                        )
                    }
                    None => (
                        format!("DELETE FROM {}", target),
                        format!(
                            "INSERT INTO {} ({}) SELECT {} FROM {}",
                            target, column_list, column_list, self.staging_table
                        ),
                    ),
                };
                Ok(vec![
                    finish(delete, delete_params, mode),
                    finish(insert, insert_params, mode),
                ])
            }
            MoveOperation::Upsert {
                target,
                key_columns,
            } => {
                let key_match = key_columns
                    .iter()
                    .map(|k| format!("s.{} = {}.{}", k, target, k))
                    .collect::<Vec<_>>()
                    .join(" AND ");

                let mut delete_params = Vec::new();
                let mut insert_params = Vec::new();
                let (delete_filter, insert_filter) = match self.scope_column() {
                    Some((_, column)) => {
                        let d = self.scope_reference(scope, mode, dialect, style, &mut delete_params)?;
                        let i = self.scope_reference(scope, mode, dialect, style, &mut insert_params)?;
                        (
                            format!(" AND s.{} = {}", column.name, d),
                            format!(" WHERE {} = {}", column.name, i),
                        )
                    }
                    None => (String::new(), String::new()),
                };

                let delete = format!(
                    "DELETE FROM {} WHERE EXISTS (SELECT 1 FROM {} s WHERE {}{})",
                    target, self.staging_table, key_match, delete_filter
                );
                let insert = format!(
                    "INSERT INTO {} ({}) SELECT {} FROM {}{}",
                    target, column_list, column_list, self.staging_table, insert_filter
                );
                Ok(vec![
                    finish(delete, delete_params, mode),
                    finish(insert, insert_params, mode),
                ])
            }
        }
    }

    /// Statement reading staged rows back in a stable order
    pub fn select_statement(
        &self,
        scope: Option<&Cell>,
        dialect: Dialect,
    ) -> Result<Statement, SerializationError> {
        let column_list = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {} FROM {}", column_list, self.staging_table);
        let mut params = Vec::new();
        if let Some((_, column)) = self.scope_column()
            && scope.is_some()
        {
            let value = self.scope_reference(
                scope,
                LoadMode::Parameterized,
                dialect,
                EscapeStyle::Standard,
                &mut params,
            )?;
            sql.push_str(&format!(" WHERE {} = {}", column.name, value));
        }
        sql.push_str(&format!(" ORDER BY {}", column_list));

        Ok(finish(sql, params, LoadMode::Parameterized))
    }

    /// Check that a scope value fits this dataset
    ///
    /// Scoped datasets need a non-null value of the scope column's type;
    /// unscoped datasets take none.
    pub fn check_scope_value(&self, scope: Option<&Cell>) -> Result<(), SerializationError> {
        let scope = scope.filter(|s| !s.is_null());
        match (self.scope_column(), scope) {
            (Some((_, column)), None) => Err(SerializationError::MissingRequired {
                column: column.name.clone(),
            }),
            (Some((_, column)), Some(value)) if !column.ty.accepts(value) => {
                Err(SerializationError::InvalidValue {
                    column: column.name.clone(),
                    expected: column.ty,
                    reason: format!("scope {:?} has the wrong type", value),
                })
            }
            (None, Some(_)) => Err(SerializationError::UnexpectedScope(self.name.clone())),
            _ => Ok(()),
        }
    }

    /// Render the scope value as a literal or push it as a parameter
    fn scope_reference(
        &self,
        scope: Option<&Cell>,
        mode: LoadMode,
        dialect: Dialect,
        style: EscapeStyle,
        params: &mut Vec<Param>,
    ) -> Result<String, SerializationError> {
        self.check_scope_value(scope)?;
        let (Some((_, column)), Some(value)) = (self.scope_column(), scope) else {
            return Err(SerializationError::UnexpectedScope(self.name.clone()));
        };

        match mode {
            LoadMode::Literal => serialize_cell(value, column.zero_sentinel.as_deref(), style),
            LoadMode::Parameterized => {
                let format = column.format();
                params.push(format.param(value));
                Ok(dialect.placeholder(params.len(), format.storage_type()))
            }
        }
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.staging_table)?;

        if self.columns.is_empty() {
            return Err(DescriptorError::NoColumns(self.name.clone()));
        }

        for (i, column) in self.columns.iter().enumerate() {
            validate_identifier(&column.name)?;
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(DescriptorError::DuplicateColumn(column.name.clone()));
            }

            let fixed = match &column.source {
                ColumnSource::Constant(value) => Some(value),
                ColumnSource::Field(_) => column.default.as_ref(),
            };
            if let Some(value) = fixed
                && (!column.ty.accepts(value) || (value.is_null() && !column.nullable))
            {
                return Err(DescriptorError::InvalidValue {
                    column: column.name.clone(),
                    reason: format!("{:?} is not a valid {} value", value, column.ty),
                });
            }

            if column.zero_sentinel.is_some() && column.ty != ColumnType::Date {
                return Err(DescriptorError::InvalidValue {
                    column: column.name.clone(),
                    reason: "only date columns can declare a zero sentinel".to_string(),
                });
            }
        }

        if let Some(scope) = &self.scope {
            let column = self
                .column(&scope.column)
                .ok_or_else(|| DescriptorError::UnknownColumn(scope.column.clone()))?;
            if column.nullable {
                return Err(DescriptorError::NullableScope(scope.column.clone()));
            }
        }

        match &self.move_operation {
            MoveOperation::Procedure { name, .. } => validate_identifier(name)?,
            MoveOperation::Replace { target } => validate_identifier(target)?,
            MoveOperation::Upsert {
                target,
                key_columns,
            } => {
                validate_identifier(target)?;
                if key_columns.is_empty() {
                    return Err(DescriptorError::NoKeyColumns(self.name.clone()));
                }
                for key in key_columns {
                    if self.column(key).is_none() {
                        return Err(DescriptorError::UnknownColumn(key.clone()));
                    }
                }
            }
        }

        Ok(())
    }
}

fn finish(sql: String, params: Vec<Param>, mode: LoadMode) -> Statement {
    match mode {
        LoadMode::Literal => Statement::Literal { sql, rows: 0 },
        LoadMode::Parameterized => Statement::Parameterized {
            sql,
            params,
            rows: 0,
        },
    }
}

/// Builder for [`DatasetDescriptor`]
#[derive(Debug, Clone)]
pub struct DatasetDescriptorBuilder {
    name: String,
    staging_table: Option<String>,
    columns: Vec<ColumnSpec>,
    scope: Option<ScopeKey>,
    move_operation: Option<MoveOperation>,
}

impl DatasetDescriptorBuilder {
    pub fn staging_table(mut self, table: impl Into<String>) -> Self {
        self.staging_table = Some(table.into());
        self
    }

    /// Append a column; columns are staged in the order they are added
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Clear staging by this column's value instead of truncating it
    pub fn scoped_by(mut self, column: impl Into<String>) -> Self {
        self.scope = Some(ScopeKey {
            column: column.into(),
        });
        self
    }

    /// Promote with a stored procedure
    pub fn move_procedure(mut self, name: impl Into<String>, pass_scope: bool) -> Self {
        self.move_operation = Some(MoveOperation::Procedure {
            name: name.into(),
            pass_scope,
        });
        self
    }

    pub fn move_operation(mut self, operation: MoveOperation) -> Self {
        self.move_operation = Some(operation);
        self
    }

    /// Validate and build the descriptor
    pub fn build(self) -> Result<DatasetDescriptor, DescriptorError> {
        let staging_table = self
            .staging_table
            .ok_or_else(|| DescriptorError::MissingStagingTable(self.name.clone()))?;
        let move_operation = self
            .move_operation
            .ok_or_else(|| DescriptorError::MissingMoveOperation(self.name.clone()))?;

        let descriptor = DatasetDescriptor {
            name: self.name,
            staging_table,
            columns: self.columns,
            scope: self.scope,
            move_operation,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn navs() -> DatasetDescriptor {
        DatasetDescriptor::builder("navs")
            .staging_table("stg_navs")
            .column(ColumnSpec::text("ticker").required())
            .column(ColumnSpec::date("as_of").required())
            .column(ColumnSpec::number("nav"))
            .scoped_by("as_of")
            .move_operation(MoveOperation::Replace {
                target: "navs".to_string(),
            })
            .build()
            .unwrap()
    }

    fn as_of() -> Cell {
        Cell::Date(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap())
    }

    #[test]
    fn test_builder_validates() {
        let missing_table = DatasetDescriptor::builder("x")
            .column(ColumnSpec::text("a"))
            .move_procedure("p", false)
            .build();
        assert!(matches!(
            missing_table,
            Err(DescriptorError::MissingStagingTable(_))
        ));

        let bad_identifier = DatasetDescriptor::builder("x")
            .staging_table("stg x")
            .column(ColumnSpec::text("a"))
            .move_procedure("p", false)
            .build();
        assert!(matches!(
            bad_identifier,
            Err(DescriptorError::Identifier(_))
        ));

        let duplicate = DatasetDescriptor::builder("x")
            .staging_table("stg")
            .column(ColumnSpec::text("a"))
            .column(ColumnSpec::number("a"))
            .move_procedure("p", false)
            .build();
        assert!(matches!(duplicate, Err(DescriptorError::DuplicateColumn(_))));

        let nullable_scope = DatasetDescriptor::builder("x")
            .staging_table("stg")
            .column(ColumnSpec::date("d"))
            .scoped_by("d")
            .move_procedure("p", true)
            .build();
        assert!(matches!(
            nullable_scope,
            Err(DescriptorError::NullableScope(_))
        ));

        let bad_constant = DatasetDescriptor::builder("x")
            .staging_table("stg")
            .column(ColumnSpec::constant(
                "source",
                ColumnType::Number,
                Cell::Text("model".into()),
            ))
            .move_procedure("p", false)
            .build();
        assert!(matches!(
            bad_constant,
            Err(DescriptorError::InvalidValue { .. })
        ));

        let bad_key = DatasetDescriptor::builder("x")
            .staging_table("stg")
            .column(ColumnSpec::text("a"))
            .move_operation(MoveOperation::Upsert {
                target: "t".into(),
                key_columns: vec!["b".into()],
            })
            .build();
        assert!(matches!(bad_key, Err(DescriptorError::UnknownColumn(_))));
    }

    #[test]
    fn test_clear_statement_scoped() {
        let descriptor = navs();
        let literal = descriptor
            .clear_statement(
                Some(&as_of()),
                LoadMode::Literal,
                Dialect::Postgres,
                EscapeStyle::Standard,
            )
            .unwrap();
        assert_eq!(
            literal.sql(),
            "DELETE FROM stg_navs WHERE as_of = '2024-05-31'"
        );

        let params = descriptor
            .clear_statement(
                Some(&as_of()),
                LoadMode::Parameterized,
                Dialect::Postgres,
                EscapeStyle::Standard,
            )
            .unwrap();
        assert_eq!(params.sql(), "DELETE FROM stg_navs WHERE as_of = $1");
        assert_eq!(params.params()[0].value, as_of());
    }

    #[test]
    fn test_clear_requires_scope_value() {
        let err = navs()
            .clear_statement(None, LoadMode::Literal, Dialect::DuckDb, EscapeStyle::Standard)
            .unwrap_err();
        assert_eq!(
            err,
            SerializationError::MissingRequired {
                column: "as_of".into()
            }
        );

        let err = navs()
            .clear_statement(
                Some(&Cell::Text("2024-05-31".into())),
                LoadMode::Literal,
                Dialect::DuckDb,
                EscapeStyle::Standard,
            )
            .unwrap_err();
        assert!(matches!(err, SerializationError::InvalidValue { .. }));
    }

    #[test]
    fn test_replace_move_statements() {
        let statements = navs()
            .move_statements(
                Some(&as_of()),
                LoadMode::Literal,
                Dialect::DuckDb,
                EscapeStyle::Standard,
            )
            .unwrap();
        let sql: Vec<&str> = statements.iter().map(Statement::sql).collect();
        assert_eq!(
            sql,
            vec![
                "DELETE FROM navs WHERE as_of = '2024-05-31'",
                "INSERT INTO navs (ticker, as_of, nav) SELECT ticker, as_of, nav FROM stg_navs WHERE as_of = '2024-05-31'",
            ]
        );
    }

    #[test]
    fn test_procedure_move_statement() {
        let descriptor = navs()
            .with_move_operation(MoveOperation::Procedure {
                name: "usp_move_navs".into(),
                pass_scope: true,
            })
            .unwrap();
        let statements = descriptor
            .move_statements(
                Some(&as_of()),
                LoadMode::Parameterized,
                Dialect::Postgres,
                EscapeStyle::Standard,
            )
            .unwrap();
        assert_eq!(statements[0].sql(), "CALL usp_move_navs($1)");
        assert_eq!(statements[0].params().len(), 1);

        let literal = descriptor
            .move_statements(
                Some(&as_of()),
                LoadMode::Literal,
                Dialect::DuckDb,
                EscapeStyle::Standard,
            )
            .unwrap();
        assert_eq!(literal[0].sql(), "CALL usp_move_navs('2024-05-31')");

        let without_scope = navs()
            .with_move_operation(MoveOperation::Procedure {
                name: "usp_move_navs".into(),
                pass_scope: false,
            })
            .unwrap()
            .move_statements(
                Some(&as_of()),
                LoadMode::Parameterized,
                Dialect::DuckDb,
                EscapeStyle::Standard,
            )
            .unwrap();
        assert_eq!(without_scope[0].sql(), "CALL usp_move_navs()");
        assert!(without_scope[0].params().is_empty());
    }

    #[test]
    fn test_sentinel_scope_binds_text() {
        let descriptor = DatasetDescriptor::builder("navs")
            .staging_table("stg_navs")
            .column(ColumnSpec::text("ticker").required())
            .column(ColumnSpec::date("as_of").required().with_zero_sentinel("0000-00-00"))
            .scoped_by("as_of")
            .move_procedure("usp_move_navs", true)
            .build()
            .unwrap();
        assert_eq!(descriptor.columns()[1].storage_type(), ColumnType::Text);

        let clear = descriptor
            .clear_statement(
                Some(&as_of()),
                LoadMode::Parameterized,
                Dialect::DuckDb,
                EscapeStyle::Standard,
            )
            .unwrap();
        assert_eq!(clear.sql(), "DELETE FROM stg_navs WHERE as_of = $1");
        assert_eq!(clear.params()[0].ty, ColumnType::Text);
        assert_eq!(clear.params()[0].value, Cell::Text("2024-05-31".into()));
    }

    #[test]
    fn test_upsert_move_statements() {
        let descriptor = DatasetDescriptor::builder("map")
            .staging_table("stg_map")
            .column(ColumnSpec::text("broker_code").required())
            .column(ColumnSpec::text("security_id").required())
            .column(ColumnSpec::text("ticker"))
            .move_operation(MoveOperation::Upsert {
                target: "broker_map".into(),
                key_columns: vec!["broker_code".into(), "security_id".into()],
            })
            .build()
            .unwrap();

        let statements = descriptor
            .move_statements(None, LoadMode::Parameterized, Dialect::DuckDb, EscapeStyle::Standard)
            .unwrap();
        assert_eq!(
            statements[0].sql(),
            "DELETE FROM broker_map WHERE EXISTS (SELECT 1 FROM stg_map s WHERE \
             s.broker_code = broker_map.broker_code AND s.security_id = broker_map.security_id)"
        );
        assert_eq!(
            statements[1].sql(),
            "INSERT INTO broker_map (broker_code, security_id, ticker) \
             SELECT broker_code, security_id, ticker FROM stg_map"
        );
    }
}
