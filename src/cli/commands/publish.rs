//! Publish a JSON snapshot to a dataset

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::cli::input::{
    InputSource, load_catalog, load_config, load_input, parse_records, parse_scope,
};
use crate::publish::StagingPublisher;

/// Publish command arguments
#[derive(Debug, Clone)]
pub struct PublishArgs {
    pub workspace: PathBuf,
    pub dataset: String,
    pub input: InputSource,
    pub scope: Option<String>,
    pub pretty: bool,
}

/// Publish records and print the JSON report
///
/// A failed publish prints its failure summary and returns an error.
pub fn handle_publish(args: &PublishArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    let catalog = load_catalog(&config)?;
    let descriptor = catalog.require(&args.dataset)?;

    let records = parse_records(&load_input(&args.input)?)?;
    let scope = parse_scope(&descriptor, args.scope.as_deref())?;

    let publisher = StagingPublisher::from_config(&config)?;
    match publisher.publish(&descriptor, &records, scope.as_ref()) {
        Ok(report) => print_json(&report, args.pretty),
        Err(failure) => {
            print_json(&failure.summary(), args.pretty)?;
            Err(CliError::PublishFailed(failure.to_string()))
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| CliError::OutputError(e.to_string()))?;
    println!("{}", output);
    Ok(())
}
