//! Crate-level error type
//!
//! Each module has its own error enum; this wraps them for callers that
//! drive the whole pipeline.

use crate::aggregate::AggregateError;
use crate::config::ConfigError;
use crate::group::GroupError;
use crate::index::IndexError;
use crate::payload::PayloadError;
use crate::query::QueryError;
use crate::storage::StorageError;
use thiserror::Error;

/// Any error raised by the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type using the crate-level error
pub type Result<T> = std::result::Result<T, Error>;
