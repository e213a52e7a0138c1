//! Aggregation error types

use crate::payload::PayloadError;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while aggregating groups
#[derive(Error, Debug)]
pub enum AggregateError {
    /// A selected group has no members
    #[error("Group {group} has no members")]
    EmptyGroup { group: usize },

    /// A member payload's channel names differ from the group's first member
    #[error("Group {group}: {record} has channels {found:?}, expected {expected:?}")]
    ChannelMismatch {
        group: usize,
        record: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A selected group index does not exist in the grouping
    #[error("Unknown group {index} (grouping has {groups} groups)")]
    UnknownGroup { index: usize, groups: usize },

    /// A member payload could not be loaded
    #[error("Failed to load payload of {record}: {source}")]
    Payload {
        record: String,
        #[source]
        source: PayloadError,
    },

    /// Writing an exported result failed
    #[error("Failed to export to {path:?}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

/// Result type for aggregation operations
pub type AggregationResult<T> = Result<T, AggregateError>;
