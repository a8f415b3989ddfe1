//! mssql-sync CLI - SQL Server schema comparison and data synchronization.

use clap::{Parser, Subcommand};
use mssql_sync::{Config, SyncCoordinator, SyncError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mssql-sync")]
#[command(about = "Compare two SQL Server databases and synchronize the target to the source")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the two schemas and report the differences
    Compare,

    /// Compare and generate the DDL that would bring the target in line
    Scripts,

    /// Compare, generate scripts and apply them with a data copy
    Sync,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(SyncError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let mut coordinator = SyncCoordinator::new(config)?;

    match cli.command {
        Commands::Compare => {
            let result = coordinator.compare().await?;
            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_comparison(&result);
            }
        }

        Commands::Scripts => {
            let mut result = coordinator.compare().await?;
            coordinator.generate_scripts(&mut result).await?;
            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_scripts(&result);
            }
        }

        Commands::Sync => {
            let mut result = coordinator.compare().await?;
            coordinator.generate_scripts(&mut result).await?;
            let report = coordinator.synchronize(&result).await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("\nSynchronization completed!");
                println!("  Foreign keys dropped: {}", report.foreign_keys_dropped);
                println!("  Indexes dropped: {}", report.indexes_dropped);
                println!("  Tables cleared: {}", report.tables_cleared);
                println!(
                    "  Schema statements applied: {}",
                    report.schema_statements_applied
                );
                println!("  Rows inserted: {}", report.rows_inserted);
                println!("  Indexes created: {}", report.indexes_created);
                println!("  Foreign keys created: {}", report.foreign_keys_created);
                let failed: Vec<&str> = report
                    .tables
                    .iter()
                    .filter(|t| matches!(t.status, mssql_sync::TableStatus::Failed { .. }))
                    .map(|t| t.table.as_str())
                    .collect();
                if !failed.is_empty() {
                    println!("  Failed tables: {:?}", failed);
                }
            }
        }
    }

    Ok(())
}

fn print_comparison(result: &mssql_sync::ComparisonResult) {
    if result.is_empty() {
        println!("Databases are identical");
        return;
    }
    println!("Differences found:");
    println!("  Missing schemas: {}", result.missing_schemas.len());
    println!("  Missing tables: {}", result.missing_tables.len());
    println!("  Missing columns: {}", result.missing_columns.len());
    println!("  Different columns: {}", result.different_columns.len());
    println!("  Missing indexes: {}", result.missing_indexes.len());
    println!(
        "  Missing foreign keys: {}",
        result.missing_foreign_keys.len()
    );
}

fn print_scripts(result: &mssql_sync::ComparisonResult) {
    let scripts = result
        .missing_schemas
        .iter()
        .map(|d| &d.script)
        .chain(result.missing_tables.iter().map(|d| &d.script))
        .chain(result.different_columns.iter().map(|d| &d.script))
        .chain(result.missing_columns.iter().map(|d| &d.script))
        .chain(result.missing_indexes.iter().map(|d| &d.script))
        .chain(result.missing_foreign_keys.iter().map(|d| &d.script));

    let mut any = false;
    for script in scripts.filter_map(|s| s.text()) {
        println!("{}", script.trim());
        any = true;
    }
    if !any {
        println!("-- Nothing to do");
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        level @ ("debug" | "info" | "warn" | "error") => level.to_string(),
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    // RUST_LOG takes precedence over --verbosity when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
