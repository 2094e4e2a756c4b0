//! List the configured datasets

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::error::CliError;
use crate::cli::input::{load_catalog, load_config};
use crate::datasets::DatasetDescriptor;

/// Datasets command arguments
#[derive(Debug, Clone)]
pub struct DatasetsArgs {
    pub workspace: PathBuf,
    /// Print JSON instead of a table
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct DatasetSummary<'a> {
    name: &'a str,
    staging_table: &'a str,
    scope: Option<&'a str>,
    columns: usize,
    move_operation: String,
}

impl<'a> DatasetSummary<'a> {
    fn new(descriptor: &'a DatasetDescriptor) -> Self {
        Self {
            name: descriptor.name(),
            staging_table: descriptor.staging_table(),
            scope: descriptor.scope().map(|s| s.column.as_str()),
            columns: descriptor.columns().len(),
            move_operation: descriptor.move_operation().to_string(),
        }
    }
}

/// Print every dataset with its staging table, scope and move operation
pub fn handle_datasets(args: &DatasetsArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    let catalog = load_catalog(&config)?;
    let summaries: Vec<_> = catalog.iter().map(|d| DatasetSummary::new(d)).collect();

    if args.json {
        let output = serde_json::to_string_pretty(&summaries)
            .map_err(|e| CliError::OutputError(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    println!(
        "{:<26} {:<32} {:<16} {}",
        "DATASET", "STAGING TABLE", "SCOPE", "MOVE"
    );
    for summary in &summaries {
        println!(
            "{:<26} {:<32} {:<16} {}",
            summary.name,
            summary.staging_table,
            summary.scope.unwrap_or("-"),
            summary.move_operation
        );
    }
    Ok(())
}
