//! # Measureset
//!
//! Metadata-indexed query, grouping and aggregation over collections of lab
//! instrument measurements. Each measurement is a raw time-series payload
//! tagged with a metadata record (voltage, delay, sample id, ...).
//!
//! ## Features
//!
//! - **Indexing**: one scan of a storage location into a typed metadata table
//! - **Queries**: a small filter language, type-checked before any record is read
//! - **Grouping**: stable, first-seen group numbering by any set of fields
//! - **Analysis**: ordered per-payload transform steps, optionally saving each stage
//! - **Aggregation**: lazy, bounded-parallel payload loading and per-point statistics
//!
//! ## Modules
//!
//! - [`storage`]: ekpy data files and the per-directory metadata table
//! - [`index`]: metadata index built from a storage scan
//! - [`query`]: filter expression parser and evaluator
//! - [`group`]: grouping engine
//! - [`payload`]: pluggable payload loaders and analysis pipelines
//! - [`aggregate`]: per-group statistics and export
//! - [`dataset`]: the programmatic entry points tying the stages together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use measureset::{Dataset, Statistic};
//!
//! fn main() -> measureset::Result<()> {
//!     // Index a directory of measurements
//!     let (dataset, report) = Dataset::open("data/pulse_sweep")?;
//!     println!("{} records, {} skipped", report.indexed, report.malformed.len());
//!
//!     // Filter, group and average
//!     let grouped = dataset
//!         .query("delay < 100 and sample == 'D0'")?
//!         .group(&["voltage"])?;
//!     let result = grouped.aggregate(Statistic::Mean)?;
//!
//!     for group in result.iter() {
//!         println!("group {} ({}): {} points", group.group, group.key, group.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod group;
pub mod index;
pub mod logging;
pub mod payload;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use dataset::{Dataset, GroupSelection, Grouped, Selection};

pub use error::{Error, Result};

pub use index::{
    BuildReport, FieldKind, FieldValue, IndexError, IndexOptions, MetadataIndex, MetadataRecord,
    PayloadRef,
};

pub use query::{parse_expression, Expr, Predicate, QueryEngine, QueryError};

pub use group::{Group, GroupError, GroupKey, GroupedIndex};

pub use payload::{
    EkpyLoader, FnTransform, JsonLoader, LoaderRegistry, Payload, PayloadError, PayloadLoader,
    PayloadTransform, Pipeline,
};

pub use aggregate::{
    export_ekpy, AggregateError, AggregateResult, Aggregator, Alignment, ChannelCurve,
    GroupAggregate, Statistic,
};

pub use storage::{read_ekpy_data, write_ekpy_data, StorageError, TrialWriter};

pub use config::{generate_default_config, Config, ConfigError};

pub use logging::init_logging;
