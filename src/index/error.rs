//! Index error types
//!
//! Errors raised while scanning a storage location into a metadata index.

use crate::index::value::FieldKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a metadata index
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// The storage location cannot be enumerated or its metadata table opened
    #[error("Storage unreadable at {location:?}: {reason}")]
    StorageUnreadable { location: PathBuf, reason: String },

    /// One record could not be parsed; it is skipped
    #[error("Malformed metadata for {record}: {reason}")]
    MetadataMalformed { record: String, reason: String },

    /// No record survived the scan
    #[error("No metadata records at {location:?} ({} malformed)", .malformed.len())]
    EmptyIndex {
        location: PathBuf,
        malformed: Vec<IndexError>,
    },

    /// A field holds values of two different kinds across records
    #[error("Field '{field}' is {expected} but {record} holds a {found}")]
    MixedFieldKinds {
        field: String,
        expected: FieldKind,
        found: FieldKind,
        record: String,
    },
}

impl IndexError {
    pub(crate) fn unreadable(location: impl Into<PathBuf>, reason: impl ToString) -> Self {
        IndexError::StorageUnreadable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(record: impl Into<String>, reason: impl ToString) -> Self {
        IndexError::MetadataMalformed {
            record: record.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
