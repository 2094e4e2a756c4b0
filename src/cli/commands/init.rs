//! Initialize a workspace: configuration file and tables

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::cli::input::{load_catalog, load_config};
use crate::database::{BackendKind, PublishConfig, open_backend};

/// Init command arguments
#[derive(Debug, Clone)]
pub struct InitArgs {
    pub workspace: PathBuf,
    /// Backend to record in a new configuration file
    pub backend: BackendKind,
    /// PostgreSQL connection string (postgres backend)
    pub connection_string: Option<String>,
    /// Only write the configuration, do not create tables
    pub config_only: bool,
}

/// Write `.fund-publish.toml` if missing, then create staging and target tables
pub fn handle_init(args: &InitArgs) -> Result<(), CliError> {
    if !args.workspace.is_dir() {
        return Err(CliError::FileNotFound(args.workspace.clone()));
    }

    if PublishConfig::exists(&args.workspace) {
        println!("Configuration already present in {}", args.workspace.display());
    } else {
        let config = match args.backend {
            BackendKind::DuckDb => PublishConfig::default(),
            BackendKind::Postgres => {
                let url = args.connection_string.as_deref().ok_or_else(|| {
                    CliError::InvalidArgument(
                        "--connection-string is required for the postgres backend".to_string(),
                    )
                })?;
                PublishConfig::postgres(url)
            }
        };
        let path = config.save(&args.workspace)?;
        println!("✅ Wrote configuration: {}", path.display());
    }

    if args.config_only {
        return Ok(());
    }

    let config = load_config(&args.workspace)?;
    let catalog = load_catalog(&config)?;
    let backend = open_backend(&config)?;
    backend.initialize(&catalog)?;
    println!(
        "✅ Created tables for {} datasets ({})",
        catalog.len(),
        backend.backend_type()
    );
    Ok(())
}
