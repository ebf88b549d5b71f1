//! Showcase commands
//!
//! Usage: quarry run <NAME> [ARGS]...
//!        quarry list

use clap::Args;
use quarry_core_types::RequestContext;
use quarry_engine::commands::showcase::{apply_showcase, ShowcaseQuery, CATALOGUE};
use quarry_store::Facade;

use crate::config::CliConfig;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Catalogue name (see `quarry list`)
    pub name: String,

    /// Positional arguments for the query
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

pub fn execute(config: &CliConfig, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Parse first so a typo never touches the database
    let query = ShowcaseQuery::from_args(&args.name, &args.args)?;

    let mut db = config.open()?;
    let ctx = RequestContext::new().with_caller(query.name());
    let value = apply_showcase(&mut Facade::with_context(&mut db, ctx), &query)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    if query.is_write() {
        eprintln!("✓ Committed to {}", config.db.display());
    }

    db.close()?;
    Ok(())
}

pub fn list() -> Result<(), Box<dyn std::error::Error>> {
    for (name, synopsis) in CATALOGUE {
        if synopsis.is_empty() {
            println!("{}", name);
        } else {
            println!("{} {}", name, synopsis);
        }
    }
    Ok(())
}
