//! Render a publish as literal SQL without touching a database

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::cli::input::{
    InputSource, load_catalog, load_config, load_input, parse_records, parse_scope,
};
use crate::publish::PublishPlan;
use crate::sql::EscapeStyle;

/// Render command arguments
#[derive(Debug, Clone)]
pub struct RenderArgs {
    pub workspace: PathBuf,
    pub dataset: String,
    pub input: InputSource,
    pub scope: Option<String>,
    /// Overrides the configured escape style
    pub escape_style: Option<EscapeStyle>,
}

/// Print the clear, load and move statements of a publish
pub fn handle_render(args: &RenderArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    let catalog = load_catalog(&config)?;
    let descriptor = catalog.require(&args.dataset)?;

    let records = parse_records(&load_input(&args.input)?)?;
    let scope = parse_scope(&descriptor, args.scope.as_deref())?;
    let style = args.escape_style.unwrap_or(config.publish.escape_style);

    let plan = PublishPlan::literal(&descriptor, &records, scope.as_ref(), &config.publish, style)?;
    print!("{}", plan.to_sql());
    eprintln!(
        "-- {} rows in {} statements, content hash {}",
        plan.rows,
        plan.load.len(),
        plan.content_hash
    );
    Ok(())
}
