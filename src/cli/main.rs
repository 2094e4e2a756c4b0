//! CLI binary entry point for fund-publish

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use fund_publish::cli::commands::datasets::{DatasetsArgs, handle_datasets};
#[cfg(feature = "cli")]
use fund_publish::cli::commands::init::{InitArgs, handle_init};
#[cfg(feature = "cli")]
use fund_publish::cli::commands::publish::{PublishArgs, handle_publish};
#[cfg(feature = "cli")]
use fund_publish::cli::commands::render::{RenderArgs, handle_render};
#[cfg(feature = "cli")]
use fund_publish::cli::input::InputSource;
#[cfg(feature = "cli")]
use fund_publish::database::BackendKind;
#[cfg(feature = "cli")]
use fund_publish::sql::EscapeStyle;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "fund-publish")]
#[command(about = "Publish fund-analytics snapshots through staging tables")]
#[command(version)]
struct Cli {
    /// Workspace directory holding .fund-publish.toml
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// List configured datasets
    Datasets {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a configuration file and create staging/target tables
    Init {
        /// Database backend (duckdb, postgres)
        #[arg(short, long, default_value = "duckdb")]
        backend: String,
        /// PostgreSQL connection string (required for postgres backend)
        #[arg(long)]
        connection_string: Option<String>,
        /// Only write the configuration file
        #[arg(long)]
        config_only: bool,
    },

    /// Print the literal SQL a publish would run
    Render {
        /// Dataset name
        #[arg(short, long)]
        dataset: String,
        /// JSON array of records, or '-' for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Scope value for scoped datasets
        #[arg(short, long)]
        scope: Option<String>,
        /// Escape style (standard, backslash)
        #[arg(long)]
        escape_style: Option<String>,
    },

    /// Publish records and print the report
    Publish {
        /// Dataset name
        #[arg(short, long)]
        dataset: String,
        /// JSON array of records, or '-' for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Scope value for scoped datasets
        #[arg(short, long)]
        scope: Option<String>,
        /// Pretty-print the JSON report
        #[arg(short, long)]
        pretty: bool,
    },
}

#[cfg(feature = "cli")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn main() {
    use fund_publish::cli::error::CliError;

    init_tracing();
    let cli = Cli::parse();
    let workspace = cli.workspace;

    let result = match cli.command {
        Commands::Datasets { json } => handle_datasets(&DatasetsArgs { workspace, json }),
        Commands::Init {
            backend,
            connection_string,
            config_only,
        } => backend
            .parse::<BackendKind>()
            .map_err(CliError::InvalidArgument)
            .and_then(|backend| {
                handle_init(&InitArgs {
                    workspace,
                    backend,
                    connection_string,
                    config_only,
                })
            }),
        Commands::Render {
            dataset,
            input,
            scope,
            escape_style,
        } => escape_style
            .map(|s| s.parse::<EscapeStyle>())
            .transpose()
            .map_err(CliError::InvalidArgument)
            .and_then(|escape_style| {
                handle_render(&RenderArgs {
                    workspace,
                    dataset,
                    input: InputSource::parse(&input),
                    scope,
                    escape_style,
                })
            }),
        Commands::Publish {
            dataset,
            input,
            scope,
            pretty,
        } => handle_publish(&PublishArgs {
            workspace,
            dataset,
            input: InputSource::parse(&input),
            scope,
            pretty,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
