//! Measureset Payload Loading
//!
//! Raw measurement data is only read on demand, one record at a time:
//!
//! - **types**: [`Payload`], named channels over a shared axis
//! - **ekpy**: loader for ekpy data files and plain CSV tables (`csv`)
//! - **json**: loader for column-oriented JSON tables (`json`)
//! - **registry**: picks a loader by the record's format tag
//! - **pipeline**: ordered analysis steps run on each loaded payload
//! - **error**: Error types
//!
//! Nothing is cached. Loaders hold only configuration, so one loader can
//! serve many threads at once.

mod ekpy;
mod error;
mod json;
mod pipeline;
mod registry;
mod types;

use crate::index::MetadataRecord;

pub use ekpy::EkpyLoader;
pub use error::{PayloadError, PayloadResult};
pub use json::JsonLoader;
pub use pipeline::{FnTransform, PayloadTransform, Pipeline};
pub use registry::{default_registry, LoaderRegistry};
pub use types::{Payload, DEFAULT_AXIS};

/// Reads the payload a metadata record points at
pub trait PayloadLoader: Send + Sync {
    /// Format tag this loader handles (lower-case file extension)
    fn format(&self) -> &str;

    /// Load the record's payload
    fn load(&self, record: &MetadataRecord) -> PayloadResult<Payload>;
}
