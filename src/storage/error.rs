//! Storage layer error types
//!
//! Errors raised while reading or writing ekpy data files and the
//! `meta_data.csv` table that accompanies them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV table could not be read or written
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The ekpy heading was opened but never completed
    #[error("Unterminated ekpy heading in {path:?}")]
    UnterminatedHeading { path: PathBuf },

    /// A heading line is not of the form `key:::value`
    #[error("Malformed heading line {line} in {path:?}: '{text}'")]
    MalformedHeading {
        path: PathBuf,
        line: usize,
        text: String,
    },

    /// The metadata row does not have the columns of the existing table
    #[error("Metadata columns {found:?} do not match existing columns {expected:?} in {path:?}")]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Columns passed to a writer have different lengths
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },

    /// A base name cannot be turned into a trial file name
    #[error("Invalid trial base name: '{0}'")]
    InvalidBaseName(String),
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::InvalidBaseName("a/b".to_string());
        assert_eq!(err.to_string(), "Invalid trial base name: 'a/b'");

        let err = StorageError::RaggedColumns {
            column: "p1".to_string(),
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "Column 'p1' has 2 rows, expected 3");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }
}
