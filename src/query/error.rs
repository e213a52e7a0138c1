//! Query error types
//!
//! Every query failure is raised before any record is scanned.

use thiserror::Error;

/// Errors that can occur while parsing or type-checking a filter expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Syntax error, unknown field or a comparison the field's kind does not allow
    #[error("Invalid expression at '{fragment}': {reason}")]
    InvalidExpression { fragment: String, reason: String },
}

impl QueryError {
    pub(crate) fn invalid(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::InvalidExpression {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    /// Offending piece of the expression
    pub fn fragment(&self) -> &str {
        match self {
            QueryError::InvalidExpression { fragment, .. } => fragment,
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
