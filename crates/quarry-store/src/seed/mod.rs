//! Seed import system
//!
//! Provides:
//! - Seed format v0 (YAML list of records to create)
//! - Parser turning YAML into create descriptors via schema metadata
//! - Importer running every record in one transaction

pub mod format_v0;
pub mod importer;
pub mod parser;

pub use format_v0::{SeedRecord, SeedV0};
pub use importer::{import_default_seed, import_seed, import_seed_str, SeedReport};
pub use parser::{parse_seed_str, ParsedSeed};

/// The built-in seed: three users, five posts, two categories
pub const DEFAULT_SEED: &str = include_str!("../../seeds/default.yaml");
