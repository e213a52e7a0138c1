//! Payload error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// The payload file is missing or cannot be parsed
    #[error("Payload unreadable at {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// No loader is registered for the payload's format tag
    #[error("Unsupported payload format '{format}' for {path:?}")]
    FormatUnsupported { format: String, path: PathBuf },

    /// A channel's length differs from the axis length
    #[error("Channel '{channel}' has {found} samples, axis has {expected}")]
    RaggedChannel {
        channel: String,
        expected: usize,
        found: usize,
    },

    /// An analysis step rejected the payload
    #[error("Analysis step '{step}' failed: {reason}")]
    Transform { step: String, reason: String },

    /// An intermediate analysis result could not be written
    #[error("Cannot save intermediate {path:?}: {reason}")]
    Intermediate { path: PathBuf, reason: String },
}

impl PayloadError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PayloadError::Unreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Failure raised from inside an analysis step
    pub fn transform(step: impl Into<String>, reason: impl ToString) -> Self {
        PayloadError::Transform {
            step: step.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for payload operations
pub type PayloadResult<T> = Result<T, PayloadError>;
