//! Database connection management
//!
//! Opens SQLite connections, applies the configured pragmas and brings the
//! schema up to date.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use quarry_core::errors::{QxError, QxErrorKind};
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

/// SQLite journal mode requested at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
    Memory,
    /// Disables rollback; atomic batches are refused in this mode
    Off,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Wal => "wal",
            JournalMode::Delete => "delete",
            JournalMode::Memory => "memory",
            JournalMode::Off => "off",
        }
    }
}

impl std::str::FromStr for JournalMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wal" => Ok(JournalMode::Wal),
            "delete" => Ok(JournalMode::Delete),
            "memory" => Ok(JournalMode::Memory),
            "off" => Ok(JournalMode::Off),
            other => Err(format!("unknown journal mode '{}'", other)),
        }
    }
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `None` opens a private in-memory database
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
            journal_mode: JournalMode::Memory,
        }
    }
}

impl StoreConfig {
    /// File-backed database with WAL journaling
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            journal_mode: JournalMode::Wal,
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    pub fn with_busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// An open, configured and migrated store
pub struct Database {
    conn: Connection,
    config: StoreConfig,
}

impl Database {
    /// Open the database described by `config` and apply pending migrations
    pub fn open(config: StoreConfig) -> Result<Self> {
        let mut conn = match &config.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| crate::errors::io_error("open_database", e))?;
                }
                Connection::open(path).map_err(from_rusqlite)?
            }
            None => Connection::open_in_memory().map_err(from_rusqlite)?,
        };

        configure(&conn, &config)?;
        apply_migrations(&mut conn)?;

        tracing::debug!(
            component = "store",
            path = ?config.path,
            journal_mode = config.journal_mode.as_str(),
            "database opened"
        );

        Ok(Self { conn, config })
    }

    /// Open a fresh in-memory database (for tests and demos)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Journal mode SQLite actually settled on
    pub fn journal_mode(&self) -> Result<String> {
        self.conn
            .query_row("PRAGMA journal_mode", [], |row| row.get::<_, String>(0))
            .map_err(from_rusqlite)
    }

    /// Check whether an all-or-nothing commit can be honoured right now
    ///
    /// Fails with `UnsupportedOperation` when a transaction is already open
    /// on this connection or the journal is disabled.
    pub fn ensure_atomic_commit(&self) -> Result<()> {
        let reason = if !self.conn.is_autocommit() {
            Some("a transaction is already open on this connection".to_string())
        } else if self.journal_mode()?.eq_ignore_ascii_case("off") {
            Some("journal_mode is OFF, rollback is impossible".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => Err(QxError::new(QxErrorKind::UnsupportedOperation)
                .with_op("run_atomic_batch")
                .with_message(format!("Atomic batch unavailable: {}", reason))),
            None => Ok(()),
        }
    }

    /// Close the connection, surfacing any error SQLite reports
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| from_rusqlite(e))
    }
}

/// Apply connection pragmas
fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(from_rusqlite)?;

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(from_rusqlite)?;

    // journal_mode answers with the mode in effect; in-memory databases
    // silently stay on "memory" when WAL is requested.
    let effective: String = conn
        .pragma_update_and_check(None, "journal_mode", config.journal_mode.as_str(), |row| {
            row.get(0)
        })
        .map_err(from_rusqlite)?;

    if effective != config.journal_mode.as_str() {
        tracing::debug!(
            component = "store",
            requested = config.journal_mode.as_str(),
            effective = %effective,
            "journal mode adjusted by sqlite"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_enables_foreign_keys() {
        let db = Database::open_in_memory().unwrap();
        let fk: i64 = db
            .conn()
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_file_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(StoreConfig::file(dir.path().join("nested/q.db"))).unwrap();
        assert_eq!(db.journal_mode().unwrap(), "wal");
        db.close().unwrap();
    }

    #[test]
    fn test_atomic_commit_refused_with_journal_off() {
        let db = Database::open(StoreConfig::in_memory().with_journal_mode(JournalMode::Off))
            .unwrap();
        let err = db.ensure_atomic_commit().unwrap_err();
        assert_eq!(err.kind(), QxErrorKind::UnsupportedOperation);
    }

    #[test]
    fn test_atomic_commit_refused_inside_open_transaction() {
        let db = Database::open_in_memory().unwrap();
        db.conn().execute_batch("BEGIN").unwrap();
        let err = db.ensure_atomic_commit().unwrap_err();
        assert_eq!(err.kind(), QxErrorKind::UnsupportedOperation);
        db.conn().execute_batch("ROLLBACK").unwrap();
        assert!(db.ensure_atomic_commit().is_ok());
    }

    #[test]
    fn test_journal_mode_from_str() {
        assert_eq!("WAL".parse::<JournalMode>().unwrap(), JournalMode::Wal);
        assert!("bogus".parse::<JournalMode>().is_err());
    }
}
