//! Quarry CLI
//!
//! Command-line interface for the Quarry query façade

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;

use config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - typed ORM-style queries over SQLite", long_about = None)]
struct Cli {
    /// Database file
    #[arg(long, global = true, env = "QUARRY_DB", default_value = ".quarry/quarry.db")]
    db: PathBuf,

    /// Milliseconds to wait for a locked database
    #[arg(long, global = true, default_value_t = 5000)]
    busy_timeout_ms: u64,

    /// Emit JSON logs
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending migrations and list what is applied
    Migrate,
    /// Seed import operations
    Seed(commands::seed::SeedArgs),
    /// Run a named showcase query
    Run(commands::run::RunArgs),
    /// List the showcase catalogue
    List,
}

fn main() {
    let cli = Cli::parse();
    let config = CliConfig {
        db: cli.db,
        busy_timeout_ms: cli.busy_timeout_ms,
        log_json: cli.log_json,
    };
    quarry_core::logging_facility::init(config.log_profile());

    let result = match cli.command {
        Commands::Migrate => commands::migrate::execute(&config),
        Commands::Seed(args) => commands::seed::execute(&config, args),
        Commands::Run(args) => commands::run::execute(&config, args),
        Commands::List => commands::run::list(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
