//! Slotledger CLI
//!
//! Opens the registry database, applies migrations and reports on it.

mod report;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use slotledger_core::config::{self, Config};
use slotledger_core::tracing_init::init_tracing;
use slotledger_store::Database;

#[derive(Parser, Debug)]
#[command(name = "slotledger")]
#[command(version, about = "Slotledger - gaming equipment and compliance registry")]
struct Args {
    /// Config file layered over the global settings.
    #[arg(long, env = "SLOTLEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log level for the Slotledger crates (e.g. debug).
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database if needed and apply pending migrations.
    Migrate,
    /// Row count per table.
    Stats {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the schema catalog.
    Schema {
        /// Only this table.
        #[arg(long)]
        table: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args);
    init_tracing(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting slotledger");

    match &args.command {
        Command::Schema { table } => {
            let text = report::schema(table.as_deref())?;
            print(&text);
        }
        Command::Migrate => {
            let path = resolve_db_path(&config)?;
            open(&path, &config).await?;
            info!(path = %path.display(), "Database is up to date");
        }
        Command::Stats { json } => {
            let path = resolve_db_path(&config)?;
            let db = open(&path, &config).await?;
            let counts = db.table_counts().await?;
            let text = if *json {
                report::stats_json(&counts)?
            } else {
                report::stats_table(&counts)
            };
            print(&text);
        }
    }

    Ok(())
}

fn apply_cli_overrides(config: &mut Config, args: &Args) {
    if let Some(path) = &args.db_path {
        config.database.path = Some(path.clone());
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.log_json {
        config.logging.json = true;
    }
}

async fn open(path: &Path, config: &Config) -> anyhow::Result<Database> {
    info!(path = %path.display(), "Opening registry database");
    Ok(Database::open_with(path, &config.database).await?)
}

fn resolve_db_path(config: &Config) -> anyhow::Result<PathBuf> {
    if let Some(path) = &config.database.path {
        return Ok(path.clone());
    }
    if let Some(path) = config::database_path() {
        return Ok(path);
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".slotledger").join("slotledger.db"))
}

#[allow(clippy::print_stdout)]
fn print(text: &str) {
    println!("{text}");
}
