//! Holoquery CLI - Command line interface for the query resolution engine

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;
mod samples;

use commands::{browse, completions, query, schema};
use config::Config;
use holoquery_engine::QueryEngine;
use holoquery_storage::{load_dir, MemoryStore};
use output::{format_error, OutputFormat};

#[derive(Parser)]
#[command(name = "holoquery")]
#[command(author, version, about = "Resolve nested graph queries over JSON datasets")]
pub struct Cli {
    /// Data directory with schema.json or schema.toml and <entity>.json files
    #[arg(short, long, env = "HOLOQUERY_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, env = "HOLOQUERY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config::default_config_path)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query
    Query(query::QueryArgs),
    /// List the built-in sample queries
    Samples,
    /// Browse the raw records of an entity type
    Browse(browse::BrowseArgs),
    /// Show entity types, primary keys and relations
    Schema,
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
    /// Manage CLI configuration
    Config(commands::config::ConfigArgs),
}

/// Application context with the loaded store and query engine
pub struct AppContext {
    pub store: Arc<MemoryStore>,
    pub engine: QueryEngine,
    pub format: OutputFormat,
}

impl AppContext {
    pub async fn new(cli: &Cli, config: &Config) -> anyhow::Result<Self> {
        let format = resolve_format(cli, config)?;

        let loaded = match cli.data_dir.as_ref().or(config.data_dir.as_ref()) {
            Some(dir) => {
                tracing::debug!("Loading datasets from {:?}", dir);
                load_dir(dir).await?
            }
            None => {
                tracing::debug!("Using built-in sample datasets");
                samples::load()?
            }
        };

        for failure in &loaded.failures {
            tracing::warn!("{}", failure);
        }

        Ok(Self {
            engine: QueryEngine::new(loaded.schema, Arc::clone(&loaded.store)),
            store: loaded.store,
            format,
        })
    }
}

/// Format flag, then config file, then the default
pub fn resolve_format(cli: &Cli, config: &Config) -> anyhow::Result<OutputFormat> {
    match (cli.format, config.format.as_deref()) {
        (Some(format), _) => Ok(format),
        (None, Some(name)) => OutputFormat::parse(name),
        (None, None) => Ok(OutputFormat::default()),
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Completions(args) => return completions::run(args),
        Commands::Config(args) => return commands::config::run(args, cli),
        Commands::Samples => return commands::samples::run(),
        _ => {}
    }

    let config = Config::load(&cli.config_path())?;
    let ctx = AppContext::new(cli, &config).await?;

    match &cli.command {
        Commands::Query(args) => query::run(args, &ctx).await,
        Commands::Browse(args) => browse::run(args, &ctx),
        Commands::Schema => schema::run(&ctx),
        Commands::Completions(_) | Commands::Config(_) | Commands::Samples => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting holoquery CLI");

    // Resolved up front so error reports use the same format as results
    let format = Config::load(&cli.config_path())
        .and_then(|config| resolve_format(&cli, &config))
        .unwrap_or_else(|_| cli.format.unwrap_or_default());

    if let Err(err) = run(&cli).await {
        match err.downcast_ref::<holoquery_core::Error>() {
            Some(query_err) => eprintln!("{}", format_error(query_err, format)),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}
