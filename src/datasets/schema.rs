//! Table definitions derived from dataset descriptors
//!
//! Generates `CREATE TABLE IF NOT EXISTS` statements that work with both
//! DuckDB and PostgreSQL. Staging and target tables share the descriptor's
//! column list. Date columns with a zero sentinel are stored as ISO text.
//! No primary keys are declared: DuckDB rejects a delete and
//! re-insert of the same key inside one transaction.

use super::catalog::DatasetCatalog;
use super::descriptor::DatasetDescriptor;

/// DDL helper for dataset tables
pub struct DatasetSchema;

impl DatasetSchema {
    /// DDL for the staging table (and its schema, if qualified)
    pub fn create_staging_sql(descriptor: &DatasetDescriptor) -> String {
        Self::create_table_sql(descriptor.staging_table(), descriptor)
    }

    /// DDL for the move target, when the move writes a known table
    ///
    /// Procedure-based datasets own their target tables, so nothing is
    /// generated for them.
    pub fn create_target_sql(descriptor: &DatasetDescriptor) -> Option<String> {
        descriptor
            .move_operation()
            .target_table()
            .map(|target| Self::create_table_sql(target, descriptor))
    }

    /// DDL for every table in the catalog, in dataset name order
    pub fn create_all_sql(catalog: &DatasetCatalog) -> String {
        let mut sql = String::new();
        for descriptor in catalog.iter() {
            sql.push_str(&Self::create_staging_sql(descriptor));
            if let Some(target) = Self::create_target_sql(descriptor) {
                sql.push_str(&target);
            }
        }
        sql
    }

    fn create_table_sql(table: &str, descriptor: &DatasetDescriptor) -> String {
        let mut sql = String::new();
        if let Some((schema, _)) = table.rsplit_once('.') {
            sql.push_str(&format!("CREATE SCHEMA IF NOT EXISTS {};\n", schema));
        }

        let columns = descriptor
            .columns()
            .iter()
            .map(|c| {
                let not_null = if c.nullable { "" } else { " NOT NULL" };
                format!("    {} {}{}", c.name, c.storage_type().sql_type(), not_null)
            })
            .collect::<Vec<_>>()
            .join(",\n");

        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
            table, columns
        ));
        sql
    }
}
