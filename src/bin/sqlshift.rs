//! sqlshift CLI - versioned SQL migrations from a directory of scripts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sqlshift::config::Options;
use sqlshift::processor::{Driver, Processor, SqlxDriver};
use sqlshift::runner::{sql_files, MigrationRecord, Runner};

#[derive(Parser)]
#[command(name = "sqlshift")]
#[command(about = "Versioned schema migrations for PostgreSQL, MySQL and SQLite")]
#[command(version)]
struct Cli {
    /// Config file [default: ./sqlshift.toml, then the user config dir]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL (postgres://, mysql://, sqlite:)
    #[arg(long, env = "SQLSHIFT_DATABASE_URL", global = true)]
    url: Option<String>,

    /// Migrations directory
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Per-statement timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Up {
        /// Stop after this version
        #[arg(long)]
        to: Option<i64>,
    },
    /// Revert applied migrations newer than a version
    Down {
        /// Version to return to (0 reverts everything)
        #[arg(long)]
        to: i64,
    },
    /// Revert the latest applied migrations
    Rollback {
        #[arg(long, default_value = "1")]
        steps: usize,
    },
    /// List applied migrations
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Check migration versions are unique and applied in order
    Validate,
    /// Show the SQL a run would execute, without executing it
    Plan {
        /// Plan a full revert instead of an upgrade
        #[arg(long)]
        down: bool,
        #[arg(long)]
        to: Option<i64>,
    },
    /// Create an empty up/down script pair
    New { name: String },
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "sqlshift=info",
        1 => "sqlshift=debug",
        _ => "sqlshift=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Cancel the run at the next statement boundary on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, stopping after the current statement...".yellow());
            child.cancel();
        }
    });
    token
}

fn print_records(records: &[MigrationRecord]) {
    if records.is_empty() {
        println!("{}", "No migrations applied.".dimmed());
        return;
    }
    println!("{:>16}  {:<20}  {}", "VERSION".bold(), "APPLIED ON".bold(), "DESCRIPTION".bold());
    for record in records {
        let applied = record
            .applied_on
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>16}  {:<20}  {}",
            record.version.to_string().cyan(),
            applied.dimmed(),
            record.description
        );
    }
}

fn print_done(label: &str, versions: &[i64]) {
    if versions.is_empty() {
        println!("{}", "Nothing to do.".green());
        return;
    }
    for version in versions {
        println!("  {} {}", "✓".green(), version.to_string().cyan());
    }
    println!("{} {} migration(s)", label.green().bold(), versions.len());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut options = Options::load(cli.config.as_deref())?;
    if let Some(dir) = cli.dir {
        options.migrations_dir = dir;
    }
    if let Some(url) = cli.url {
        options.database_url = Some(url);
    }
    if cli.timeout.is_some() {
        options.timeout_secs = cli.timeout;
    }

    if let Commands::New { name } = &cli.command {
        let (up, down) = sql_files::scaffold(&options.migrations_dir, name)?;
        println!("{} {}", "✓ Created:".green(), up.display());
        println!("{} {}", "✓ Created:".green(), down.display());
        return Ok(());
    }

    if let Commands::Plan { .. } = cli.command {
        options.preview = true;
    }

    let url = options
        .database_url
        .clone()
        .context("No database URL: pass --url, set SQLSHIFT_DATABASE_URL or database_url in sqlshift.toml")?;
    let migrations = sql_files::load_dir(&options.migrations_dir)?;
    let driver = SqlxDriver::connect(&url).await?;
    println!("{} {} ({})", "→ Connected:".dimmed(), url.yellow(), driver.dialect());

    let processor = Processor::new(driver, &options).with_cancellation(cancel_on_ctrl_c());
    let mut runner = Runner::new(processor, migrations);

    let outcome = match cli.command {
        Commands::Up { to } => runner.migrate_up(to).await.map(|v| print_done("Applied", &v)),
        Commands::Down { to } => runner.migrate_down(to).await.map(|v| print_done("Reverted", &v)),
        Commands::Rollback { steps } => {
            runner.rollback(steps).await.map(|v| print_done("Reverted", &v))
        }
        Commands::List { json } => runner.list_applied().await.and_then(|records| {
            if json {
                let text = serde_json::to_string_pretty(&records)
                    .map_err(|e| sqlshift::MigrateError::Config(e.to_string()))?;
                println!("{}", text);
            } else {
                print_records(&records);
            }
            Ok(())
        }),
        Commands::Validate => runner.validate_version_order().await.map(|_| {
            println!("{}", "✓ Migration versions are in order".green());
        }),
        Commands::Plan { down, to } => {
            println!("{}", "Preview only: statements are logged, not executed.".dimmed());
            let planned = if down {
                runner.migrate_down(to.unwrap_or(0)).await
            } else {
                runner.migrate_up(to).await
            };
            planned.map(|v| print_done("Planned", &v))
        }
        Commands::New { .. } => Ok(()),
    };

    let close = runner.into_processor().close().await;
    if let Err(e) = outcome {
        eprintln!("{}", e.format_detailed().red());
        std::process::exit(1);
    }
    close?;
    Ok(())
}
