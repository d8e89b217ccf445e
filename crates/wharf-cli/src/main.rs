use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use wharf_connector::{BatchLoader, SchemaReconciler, Session};
use wharf_core::{ConnectorConfig, LogicalTable};

/// Wharf - keep warehouse tables in sync and load staged batches
#[derive(Parser)]
#[command(name = "wharf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: wharf.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a table with a logical schema file
    Sync {
        /// Path to a JSON schema file ({"name": ..., "columns": {...}})
        schema: PathBuf,
    },

    /// Load a staged object into an existing table
    Load {
        /// Object key inside the configured staging bucket
        object_key: String,

        /// Destination table name
        #[arg(short, long)]
        table: String,
    },

    /// Verify connectivity and report whether the dataset exists
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Sync { schema } => sync_command(config, &schema, cli.verbose).await,
        Commands::Load { object_key, table } => load_command(config, &object_key, &table).await,
        Commands::Check => check_command(config).await,
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<ConnectorConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from("wharf.toml"),
    };
    if verbose {
        eprintln!("{} config from {}", "Loading".cyan(), path.display());
    }
    ConnectorConfig::from_file(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

async fn sync_command(config: ConnectorConfig, schema_path: &Path, verbose: bool) -> Result<()> {
    let table = read_schema(schema_path)?;
    let dataset = config.dataset.clone();

    let session = Session::connect(config).await?;
    let outcome = run_sync(&session, &dataset, &table, verbose).await;
    session.close().await?;
    outcome
}

async fn run_sync(
    session: &Session,
    dataset: &str,
    table: &LogicalTable,
    verbose: bool,
) -> Result<()> {
    let reconciler = SchemaReconciler::new(session);

    reconciler.ensure_dataset(dataset).await?;
    if verbose {
        eprintln!("{} dataset {}", "Ensured".cyan(), dataset);
    }

    let current = reconciler.table_schema(&table.name).await?;
    if current.is_empty() {
        reconciler.create_table(table).await?;
        println!(
            "{} table {} with {} columns",
            "Created".green(),
            table.name,
            table.len()
        );
        return Ok(());
    }

    // Only append what the remote table is missing; existing columns are
    // never retyped or removed.
    let mut patch = LogicalTable::new(&table.name);
    for (name, logical_type) in &table.columns {
        if current.column_type(name).is_none() {
            patch = patch.with_column(name, *logical_type);
        }
    }

    if patch.is_empty() {
        println!("{} table {} is up to date", "Ok".green(), table.name);
        return Ok(());
    }

    reconciler.patch_table_schema(&patch).await?;
    println!(
        "{} table {} with columns: {}",
        "Patched".green(),
        table.name,
        patch.column_names().join(", ")
    );
    Ok(())
}

async fn load_command(config: ConnectorConfig, object_key: &str, table: &str) -> Result<()> {
    let session = Session::connect(config).await?;
    let result = BatchLoader::new(&session).copy(object_key, table).await;
    session.close().await?;

    match result {
        Ok(()) => {
            println!("{} {} into table {}", "Loaded".green(), object_key, table);
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {}", "Load failed:".red(), err);
            Err(err.into())
        }
    }
}

async fn check_command(config: ConnectorConfig) -> Result<()> {
    let dataset = config.dataset.clone();
    let session = Session::connect(config).await?;

    let result = session.api().dataset_metadata(&dataset).await;
    session.close().await?;

    match result {
        Ok(_) => {
            println!("{} dataset {} is reachable", "Ok".green(), dataset);
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            println!(
                "{} connected, dataset {} does not exist yet",
                "Ok".yellow(),
                dataset
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{} {}", "Check failed:".red(), err);
            Err(err.into())
        }
    }
}

fn read_schema(path: &Path) -> Result<LogicalTable> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let table: LogicalTable = serde_json::from_str(&contents)
        .with_context(|| format!("invalid schema file {}", path.display()))?;
    Ok(table)
}
