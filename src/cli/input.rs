//! Reading records and scope values from the command line

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::cli::error::CliError;
use crate::database::PublishConfig;
use crate::datasets::encoder::cell_from_json;
use crate::datasets::{DatasetCatalog, DatasetDescriptor};
use crate::models::Cell;

/// Where records are read from
#[derive(Debug, Clone)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    /// `-` means stdin
    pub fn parse(input: &str) -> Self {
        if input == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(input))
        }
    }
}

/// Load input content from an InputSource
pub fn load_input(input: &InputSource) -> Result<String, CliError> {
    match input {
        InputSource::File(path) => {
            if !path.exists() {
                return Err(CliError::FileNotFound(path.clone()));
            }
            std::fs::read_to_string(path)
                .map_err(|e| CliError::FileReadError(path.clone(), e.to_string()))
        }
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
            Ok(buffer)
        }
    }
}

/// Parse a JSON array of records
pub fn parse_records(content: &str) -> Result<Vec<JsonValue>, CliError> {
    match serde_json::from_str(content) {
        Ok(JsonValue::Array(records)) => Ok(records),
        Ok(_) => Err(CliError::InvalidInput(
            "expected a JSON array of records".to_string(),
        )),
        Err(e) => Err(CliError::InvalidInput(format!("invalid JSON: {}", e))),
    }
}

/// Convert a `--scope` argument to a value of the dataset's scope column type
pub fn parse_scope(
    descriptor: &DatasetDescriptor,
    raw: Option<&str>,
) -> Result<Option<Cell>, CliError> {
    match (descriptor.scope_column(), raw) {
        (Some((_, column)), Some(raw)) => cell_from_json(column, &JsonValue::String(raw.into()))
            .map(Some)
            .map_err(|e| CliError::InvalidArgument(e.to_string())),
        (Some((_, column)), None) => Err(CliError::InvalidArgument(format!(
            "dataset '{}' is scoped by '{}'; pass --scope",
            descriptor.name(),
            column.name
        ))),
        (None, Some(_)) => Err(CliError::InvalidArgument(format!(
            "dataset '{}' is not scoped; remove --scope",
            descriptor.name()
        ))),
        (None, None) => Ok(None),
    }
}

/// Load the workspace configuration with the DuckDB path resolved against it
pub fn load_config(workspace: &Path) -> Result<PublishConfig, CliError> {
    let mut config = PublishConfig::load(workspace)?;
    if let Some(path) = config.duckdb_path(workspace) {
        config.database.path = Some(path.to_string_lossy().into_owned());
    }
    Ok(config)
}

/// Catalog for the workspace configuration
pub fn load_catalog(config: &PublishConfig) -> Result<DatasetCatalog, CliError> {
    Ok(DatasetCatalog::from_config(config)?)
}
