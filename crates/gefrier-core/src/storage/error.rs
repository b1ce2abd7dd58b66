//! Store error handling
//!
//! Provides typed errors for record store operations with descriptive
//! messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::database::Collection;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A tag with this name already exists
    #[error("Tag '{name}' already exists")]
    TagExists { name: String },

    /// Drawer creation referenced a freezer that is not in the store
    #[error("Freezer not found: '{id}'")]
    FreezerNotFound { id: String },

    /// Snapshot document is not valid JSON or lacks the expected shape
    #[error("Malformed snapshot: {details}")]
    MalformedSnapshot { details: String },

    /// A stored row could not be decoded
    #[error("Invalid {collection} record '{id}': {details}")]
    InvalidRecord {
        collection: Collection,
        id: String,
        details: String,
    },

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify a SQLite error, turning unique violations on `tags.name` into `TagExists`
    pub(crate) fn from_tag_insert(error: rusqlite::Error, name: &str) -> Self {
        if is_unique_violation(&error) {
            StoreError::TagExists {
                name: name.to_string(),
            }
        } else {
            StoreError::Database(error)
        }
    }

    /// Check if this error is a constraint violation the caller can treat as "already exists"
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            StoreError::TagExists { .. } => true,
            StoreError::Database(err) => is_unique_violation(err),
            _ => false,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::TagExists { .. }
                | StoreError::MalformedSnapshot { .. }
                | StoreError::FreezerNotFound { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::TagExists { .. } => Some("Pick a different tag name or reuse the existing tag."),
            StoreError::MalformedSnapshot { .. } => {
                Some("Check that the file is a backup exported by this application. Nothing was changed.")
            }
            StoreError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StoreError::InvalidRecord { .. } => {
                Some("Export a backup, then reset the store and import the backup again.")
            }
            _ => None,
        }
    }
}

/// Check if a SQLite error is a UNIQUE or PRIMARY KEY constraint violation
fn is_unique_violation(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.code == rusqlite::ErrorCode::ConstraintViolation
                && (err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn unique_violation() -> rusqlite::Error {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err()
    }

    #[test]
    fn test_unique_violation_becomes_tag_exists() {
        let err = StoreError::from_tag_insert(unique_violation(), "Fleisch");
        assert!(matches!(err, StoreError::TagExists { ref name } if name == "Fleisch"));
        assert!(err.is_constraint_violation());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_other_database_errors_pass_through() {
        let err = StoreError::from_tag_insert(rusqlite::Error::QueryReturnedNoRows, "Eis");
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_raw_unique_violation_is_constraint_violation() {
        let err = StoreError::Database(unique_violation());
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::InvalidRecord {
            collection: Collection::Items,
            id: "abc".to_string(),
            details: "bad timestamp".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("items"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("bad timestamp"));
    }

    #[test]
    fn test_malformed_snapshot_has_suggestion() {
        let err = StoreError::MalformedSnapshot {
            details: "missing field `items`".to_string(),
        };
        assert!(err.recovery_suggestion().is_some());
        assert!(err.to_string().contains("missing field"));
    }
}
