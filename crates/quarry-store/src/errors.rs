//! Error handling for quarry-store
//!
//! Wraps quarry-core QxError with store-specific helpers

use quarry_core::errors::{QxError, QxErrorKind};
use quarry_core::Entity;
use rusqlite::ffi;

/// Result type alias using QxError
pub type Result<T> = std::result::Result<T, QxError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> QxError {
    QxError::new(QxErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// An applied migration no longer matches its embedded SQL
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> QxError {
    QxError::new(QxErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create a seed validation error
pub fn seed_validation(reason: impl Into<String>) -> QxError {
    QxError::new(QxErrorKind::ValidationError)
        .with_op("seed_parse")
        .with_message(reason)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> QxError {
    QxError::new(QxErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Classify a rusqlite error
///
/// Unique and primary-key failures become `UniquenessViolation`, foreign
/// key failures `ReferentialViolation`. CHECK failures mean a value the
/// column cannot hold (an overflowed counter, say) and become
/// `ValidationError`. Everything else is `Persistence`.
pub fn from_rusqlite(err: rusqlite::Error) -> QxError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        let text = message.clone().unwrap_or_else(|| err.to_string());
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                let mut qx = QxError::new(QxErrorKind::UniquenessViolation).with_message(text.clone());
                if let Some((entity, field)) = constrained_field(&text) {
                    qx = qx.with_entity(entity).with_field(field);
                }
                return qx;
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return QxError::new(QxErrorKind::ReferentialViolation).with_message(text);
            }
            ffi::SQLITE_CONSTRAINT_CHECK => {
                return QxError::new(QxErrorKind::ValidationError).with_message(text);
            }
            _ => {}
        }
    }
    QxError::new(QxErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Map "UNIQUE constraint failed: users.email" to ("User", "email")
fn constrained_field(message: &str) -> Option<(&'static str, &'static str)> {
    let target = message.split(": ").nth(1)?.split(',').next()?.trim();
    let (table, column) = target.split_once('.')?;
    let entity = Entity::ALL.into_iter().find(|e| e.table() == table)?;
    let field = entity.field_by_column(column)?;
    Some((entity.name(), field.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constrained_field_parses_sqlite_message() {
        assert_eq!(
            constrained_field("UNIQUE constraint failed: users.email"),
            Some(("User", "email"))
        );
        assert_eq!(
            constrained_field("UNIQUE constraint failed: post_categories.post_id, post_categories.category_id"),
            None
        );
        assert_eq!(constrained_field("garbage"), None);
    }

    #[test]
    fn test_unique_failure_classified() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT UNIQUE);
             INSERT INTO users (email) VALUES ('a@b');",
        )
        .unwrap();
        let err = conn
            .execute("INSERT INTO users (email) VALUES ('a@b')", [])
            .unwrap_err();

        let qx = from_rusqlite(err);
        assert_eq!(qx.kind(), QxErrorKind::UniquenessViolation);
        assert_eq!(qx.field(), Some("email"));
    }

    #[test]
    fn test_check_failure_classified_as_validation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE counters (n INTEGER CONSTRAINT n_is_integer CHECK (typeof(n) = 'integer'));",
        )
        .unwrap();
        let err = conn
            .execute("INSERT INTO counters (n) VALUES (9223372036854775807 + 1)", [])
            .unwrap_err();

        let qx = from_rusqlite(err);
        assert_eq!(qx.kind(), QxErrorKind::ValidationError);
        assert!(qx.message().contains("n_is_integer"), "{}", qx.message());
    }
}
