//! Seed importer orchestration
//!
//! Creates every seed record through the façade's write primitives
//! inside a single transaction: a failing record leaves the store as it
//! was.

#![allow(clippy::result_large_err)]

use std::path::Path;
use std::time::Instant;

use quarry_core::{log_op_end, log_op_error, log_op_start, Entity};
use sha2::{Digest, Sha256};

use crate::db::Database;
use crate::errors::{io_error, Result};
use crate::facade::exec::insert_tree;
use crate::facade::in_write_tx;
use crate::seed::parser::parse_seed_str;
use crate::seed::DEFAULT_SEED;

/// Outcome of a seed import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// SHA-256 of the seed bytes, lowercase hex
    pub digest: String,
    /// Top-level records created, in seed order
    pub created: Vec<(Entity, i64)>,
}

/// Import a seed file
pub fn import_seed(path: &Path, db: &mut Database) -> Result<SeedReport> {
    let content = std::fs::read_to_string(path).map_err(|e| io_error("seed_read", e))?;
    import_seed_str(&content, db)
}

/// Import the built-in seed
pub fn import_default_seed(db: &mut Database) -> Result<SeedReport> {
    import_seed_str(DEFAULT_SEED, db)
}

/// Import seed YAML held in memory
pub fn import_seed_str(content: &str, db: &mut Database) -> Result<SeedReport> {
    log_op_start!("seed_import");
    let start = Instant::now();

    let result = (|| -> Result<SeedReport> {
        let seed = parse_seed_str(content)?;
        let digest = hex::encode(Sha256::digest(content.as_bytes()));

        let created = in_write_tx(db, |tx| {
            let mut created = Vec::with_capacity(seed.records.len());
            for (entity, data) in &seed.records {
                let id = insert_tree(tx, *entity, data, &[])?;
                tracing::debug!(component = "seed", entity = entity.name(), id, "seed record created");
                created.push((*entity, id));
            }
            Ok(created)
        })?;

        Ok(SeedReport { digest, created })
    })();

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(report) => log_op_end!(
            "seed_import",
            duration_ms = elapsed,
            rows = report.created.len() as u64,
            seed_digest = %report.digest
        ),
        Err(e) => log_op_error!("seed_import", e.clone(), duration_ms = elapsed),
    }
    result
}
