//! oxide-migrate-compiler CLI
//!
//! Compiles JSON migration plans into SQL.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_migrate_compiler::prelude::*;

/// Compile SQLite schema migrations ahead of time.
#[derive(Parser)]
#[command(name = "oxide-migrate-compiler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the steps that bring a database up to date.
    Steps {
        /// Plan file.
        #[arg(short, long)]
        plan: PathBuf,

        /// ID of the last migration applied to the database.
        #[arg(short, long)]
        last_applied: Option<i64>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Sql)]
        format: Format,

        /// Override the plan's SQLite version.
        #[arg(long, env = "SQLITE_VERSION")]
        dialect_version: Option<String>,

        /// Override the plan's application version.
        #[arg(long)]
        app_version: Option<String>,
    },

    /// Print Rust row structs for the final schema.
    Types {
        /// Plan file.
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Print the migrations history table DDL and last-applied query.
    Init {
        /// Use the legacy (revision, app_version, date_migrated) layout.
        #[arg(long)]
        legacy: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// One statement per line.
    Sql,
    /// JSON array of `{query, values}`.
    Json,
}

#[derive(Serialize)]
struct StepRecord<'a> {
    query: &'a str,
    values: &'a [QueryValue],
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Steps {
            plan,
            last_applied,
            format,
            dialect_version,
            app_version,
        } => {
            let plan = MigrationPlan::from_path(&plan)?;
            let mut config = plan.config.clone();
            if let Some(version) = dialect_version {
                config = config.with_dialect_version(version);
            }
            if let Some(version) = app_version {
                config = config.with_app_version(version);
            }

            let mut migrator = plan.compile_with(config)?;
            let applied = last_applied.map(AppliedMigration::new);
            let steps = migrator.steps(applied.as_ref())?;

            match format {
                Format::Sql => {
                    for step in &steps {
                        match step {
                            MigrationStep::Sql { query, values } if values.is_empty() => {
                                println!("{query}");
                            }
                            MigrationStep::Sql { query, values } => {
                                println!("{query} -- {}", serde_json::to_string(values)?);
                            }
                            MigrationStep::Script(_) | MigrationStep::AsyncScript(_) => {
                                println!("-- script");
                            }
                        }
                    }
                }
                Format::Json => {
                    let records: Vec<StepRecord<'_>> = steps
                        .iter()
                        .filter_map(|step| {
                            step.query().map(|query| StepRecord {
                                query,
                                values: step.values(),
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
            }
        }

        Commands::Types { plan } => {
            let plan = MigrationPlan::from_path(&plan)?;
            let mut migrator = plan.compile()?;
            print!("{}", migrator.types_document()?);
        }

        Commands::Init { legacy } => {
            let table = if legacy {
                MigrationTable::Legacy
            } else {
                MigrationTable::Current
            };
            info!("Migrations table layout: {:?}", table);
            println!("{}", table.create_table_sql());
            println!("{}", table.select_latest_sql());
        }
    }

    Ok(())
}
