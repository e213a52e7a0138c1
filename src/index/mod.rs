//! Measureset Metadata Index
//!
//! Scans a storage location into an in-memory table of metadata records:
//!
//! - **value**: typed metadata cells ([`FieldValue`], [`FieldKind`])
//! - **record**: one measurement's metadata plus its payload reference
//! - **source**: metadata table and header-scan sources
//! - **metadata_index**: the index itself and its build report
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! storage ──▶ MetadataSource ──▶ raw records ──▶ MetadataIndex
//!                                                   │
//!                       queries / groupings hold row positions into it
//! ```

pub mod error;
pub mod metadata_index;
pub mod record;
pub mod source;
pub mod value;

pub use error::{IndexError, IndexResult};
pub use metadata_index::{BuildReport, IndexOptions, IndexStats, MetadataIndex};
pub use record::{MetadataRecord, PayloadRef};
pub use source::{HeaderScanSource, MetaTableSource, MetadataSource, RawRecord, SourceKind};
pub use value::{FieldKind, FieldValue};
