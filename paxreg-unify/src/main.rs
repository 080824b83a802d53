//! paxreg-unify - Passenger registry builder
//!
//! Consolidates the upstream source tables into the Person registry and
//! merges duplicate clusters. Also exports or copies the finished registry.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use paxreg_common::config::{
    config_file_path, parse_source_list, resolve_database_path, TomlConfig,
};
use paxreg_common::db::RegistryStore;
use paxreg_common::SourceKind;
use paxreg_unify::export::{copy_registry, export_csv};
use paxreg_unify::{ClusterMerger, Consolidator, RunOptions};
use serde::Serialize;
use tracing::{error, info};

/// Command-line arguments for paxreg-unify
#[derive(Parser, Debug)]
#[command(name = "paxreg-unify")]
#[command(about = "Build and maintain the consolidated passenger registry")]
#[command(version)]
struct Args {
    /// Registry database file (overrides PAXREG_DATABASE and the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Consolidate all sources, then merge duplicate clusters
    Run {
        /// Drop the Person table before consolidating
        #[arg(long)]
        fresh: bool,

        /// Comma-separated source order (overrides the config file)
        #[arg(long)]
        sources: Option<String>,

        /// Skip the cluster merge
        #[arg(long)]
        no_merge: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Consolidation phase only
    Consolidate {
        /// Comma-separated source order (overrides the config file)
        #[arg(long)]
        sources: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge duplicate clusters in an existing registry
    Merge {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the Person table to a CSV file
    Export {
        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Maximum number of rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Copy the registry file (Person plus source tables) into another file
    Copy {
        /// Target database file
        #[arg(long)]
        to: PathBuf,

        /// Keep only the first N rows of every table
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Drop all persons
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting paxreg-unify v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match config_file_path(args.config.as_deref()) {
        Some(path) => info!("Loaded TOML configuration from {}", path.display()),
        None => info!("No config file found, using built-in defaults"),
    }

    let db_path = resolve_database_path(args.database.as_deref(), &config);
    info!("Registry path: {}", db_path.display());

    let store = RegistryStore::open(&db_path)
        .await
        .with_context(|| format!("Failed to open registry {}", db_path.display()))?;

    let result = execute(args.command, &store, &config, &db_path).await;
    store.close().await;

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn execute(
    command: Command,
    store: &RegistryStore,
    config: &TomlConfig,
    db_path: &Path,
) -> Result<()> {
    match command {
        Command::Run {
            fresh,
            sources,
            no_merge,
            json,
        } => {
            let options = RunOptions {
                fresh,
                sources: source_order(sources.as_deref(), config)?,
                merge: !no_merge,
                vacuum: config.merge.vacuum,
            };
            let report = paxreg_unify::run(store, &options)
                .await
                .context("Registry build failed")?;
            print_report(&report, json)?;
        }
        Command::Consolidate { sources, json } => {
            let consolidator = Consolidator::new(source_order(sources.as_deref(), config)?)?;
            let report = consolidator
                .run(store)
                .await
                .context("Consolidation failed")?;
            print_report(&report, json)?;
        }
        Command::Merge { json } => {
            let merger = ClusterMerger::new().with_vacuum(config.merge.vacuum);
            let report = merger.run(store).await.context("Cluster merge failed")?;
            print_report(&report, json)?;
        }
        Command::Export { out, limit } => {
            let rows = export_csv(store, &out, limit)
                .await
                .with_context(|| format!("Failed to export to {}", out.display()))?;
            info!("✓ {} rows written", rows);
        }
        Command::Copy { to, limit } => {
            if same_file(&to, db_path) {
                bail!("Copy target {} is the registry itself", to.display());
            }
            let report = copy_registry(store, &to, limit)
                .await
                .with_context(|| format!("Failed to copy registry to {}", to.display()))?;
            info!("✓ {} persons copied", report.persons);
            for (table, rows) in &report.source_tables {
                info!("✓ {}: {} rows copied", table, rows);
            }
        }
        Command::Reset => {
            store.reset().await.context("Failed to reset registry")?;
            store.vacuum().await.context("VACUUM failed")?;
        }
    }
    Ok(())
}

/// CLI list if given, else the configured order
fn source_order(cli: Option<&str>, config: &TomlConfig) -> Result<Vec<SourceKind>> {
    match cli {
        Some(list) => Ok(parse_source_list(list)?),
        None => Ok(config.consolidation.source_order.clone()),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn print_report<T: Serialize + std::fmt::Debug>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        info!("{:?}", report);
    }
    Ok(())
}
