//! Resolved command-line configuration

use std::path::PathBuf;

use quarry_core::logging_facility::Profile;
use quarry_store::{Database, StoreConfig};

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db: PathBuf,
    pub busy_timeout_ms: u64,
    pub log_json: bool,
}

impl CliConfig {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::file(&self.db).with_busy_timeout_ms(self.busy_timeout_ms)
    }

    pub fn log_profile(&self) -> Profile {
        if self.log_json {
            Profile::Production
        } else {
            Profile::Development
        }
    }

    /// Open the configured database, applying pending migrations
    pub fn open(&self) -> quarry_store::Result<Database> {
        Database::open(self.store_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_store::JournalMode;

    #[test]
    fn test_store_config_uses_file_and_timeout() {
        let config = CliConfig {
            db: PathBuf::from("x/q.db"),
            busy_timeout_ms: 250,
            log_json: true,
        };

        let store = config.store_config();
        assert_eq!(store.path.as_deref(), Some(std::path::Path::new("x/q.db")));
        assert_eq!(store.busy_timeout_ms, 250);
        assert_eq!(store.journal_mode, JournalMode::Wal);
        assert_eq!(config.log_profile(), Profile::Production);
    }
}
