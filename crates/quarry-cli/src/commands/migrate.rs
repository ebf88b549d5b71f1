//! Migrate command
//!
//! Usage: quarry migrate

use chrono::{TimeZone, Utc};
use quarry_store::migrations::applied_migrations;

use crate::config::CliConfig;

pub fn execute(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = config.open()?;
    for migration in applied_migrations(db.conn())? {
        let applied_at = Utc
            .timestamp_opt(migration.applied_at, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| migration.applied_at.to_string());
        println!(
            "{}  {}  {}",
            migration.migration_id,
            &migration.checksum[..12.min(migration.checksum.len())],
            applied_at
        );
    }
    db.close()?;
    Ok(())
}
