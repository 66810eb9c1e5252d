//! Storage error handling
//!
//! Provides typed errors for store operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be opened or created at its location
    #[error("Journal store unavailable at '{path}': {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The migration step failed; the store was left at its old revision
    #[error("Migration from schema {from} to {to} failed: {source}")]
    MigrationFailure {
        from: u32,
        to: u32,
        #[source]
        source: Box<StoreError>,
    },

    /// A record with this primary key already exists
    #[error("A feeling with key {0} already exists")]
    DuplicateKey(i64),

    /// No record with this primary key exists
    #[error("No feeling with key {0}")]
    NotFound(i64),

    /// The field does not exist in the store's schema revision
    #[error("Field '{field}' is not part of schema revision {version}")]
    UnsupportedField { field: &'static str, version: u32 },

    /// The requested schema revision is unknown
    #[error("Unsupported schema version {0}")]
    UnsupportedVersion(u32),

    /// Another transaction holds the connection
    #[error("A write transaction is already in progress on this store")]
    TransactionInProgress,

    /// The transaction body rejected the write
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    /// Build a `StorageUnavailable` error from an I/O failure
    pub fn unavailable_io(path: PathBuf, source: io::Error) -> Self {
        StoreError::StorageUnavailable {
            path,
            source: Box::new(source),
        }
    }

    /// Build a `StorageUnavailable` error from an SQLite failure
    pub fn unavailable_db(path: PathBuf, source: rusqlite::Error) -> Self {
        StoreError::StorageUnavailable {
            path,
            source: Box::new(source),
        }
    }

    /// Whether this error must stop the application from starting
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::StorageUnavailable { .. }
                | StoreError::MigrationFailure { .. }
                | StoreError::UnsupportedVersion(_)
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::StorageUnavailable { .. } => {
                Some("Check that the data directory exists and is writable, or point MOODLOG_DATA_DIR elsewhere.")
            }
            StoreError::MigrationFailure { .. } => {
                Some("The journal was left untouched at its previous revision. Back up the store file before retrying.")
            }
            StoreError::DuplicateKey(_) => Some("Retry with a freshly generated key."),
            StoreError::UnsupportedVersion(_) => {
                Some("This store was written by a newer version of moodlog.")
            }
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_fatal() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StoreError::unavailable_io(PathBuf::from("/test/diary.db"), io_err);

        assert!(matches!(err, StoreError::StorageUnavailable { .. }));
        assert!(err.is_fatal());
        assert!(err.recovery_suggestion().is_some());
        assert!(err.to_string().contains("/test/diary.db"));
    }

    #[test]
    fn test_migration_failure_display() {
        let err = StoreError::MigrationFailure {
            from: 1,
            to: 2,
            source: Box::new(StoreError::Aborted("bad record".to_string())),
        };

        let msg = err.to_string();
        assert!(msg.contains("schema 1 to 2"));
        assert!(msg.contains("bad record"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_per_operation_errors_are_not_fatal() {
        assert!(!StoreError::DuplicateKey(5).is_fatal());
        assert!(!StoreError::NotFound(5).is_fatal());
        assert!(!StoreError::TransactionInProgress.is_fatal());
        assert_eq!(
            StoreError::DuplicateKey(5).to_string(),
            "A feeling with key 5 already exists"
        );
    }
}
