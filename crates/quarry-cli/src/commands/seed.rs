//! Seed import command
//!
//! Usage: quarry seed import [PATH]
//!
//! Without a path the built-in seed is imported.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use quarry_store::seed::{import_default_seed, import_seed, SeedReport};

use crate::config::CliConfig;

#[derive(Debug, Args)]
pub struct SeedArgs {
    #[command(subcommand)]
    pub command: SeedCommand,
}

#[derive(Debug, Subcommand)]
pub enum SeedCommand {
    /// Import a seed file, a directory of seed files, or the built-in seed
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Path to seed YAML file or directory
    pub path: Option<PathBuf>,
}

pub fn execute(config: &CliConfig, args: SeedArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SeedCommand::Import(import_args) => execute_import(config, import_args),
    }
}

fn report(report: &SeedReport) {
    println!(
        "✓ Imported {} records (digest: {})",
        report.created.len(),
        report.digest
    );
}

fn execute_import(config: &CliConfig, args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = config.open()?;

    match args.path {
        None => {
            println!("Importing built-in seed...");
            report(&import_default_seed(&mut db)?);
        }
        Some(dir) if dir.is_dir() => {
            // Sorted for determinism
            let mut seed_files: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension()
                        .map(|ext| ext == "yaml" || ext == "yml")
                        .unwrap_or(false)
                })
                .collect();
            seed_files.sort();

            for seed_file in seed_files {
                println!("Importing {}...", seed_file.display());
                report(&import_seed(&seed_file, &mut db)?);
            }
        }
        Some(file) => {
            println!("Importing {}...", file.display());
            report(&import_seed(&file, &mut db)?);
        }
    }

    db.close()?;
    Ok(())
}
