//! Grouping error types

use thiserror::Error;

/// Errors that can occur while grouping or selecting groups
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GroupError {
    /// A grouping field is not a field of the index
    #[error("Unknown grouping field '{field}'")]
    UnknownGroupingField { field: String },

    /// A selected group index does not exist in this grouping
    #[error("Unknown group {index} (grouping has {groups} groups)")]
    UnknownGroup { index: usize, groups: usize },
}

/// Result type for grouping operations
pub type GroupResult<T> = Result<T, GroupError>;
