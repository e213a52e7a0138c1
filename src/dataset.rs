//! Programmatic entry points
//!
//! [`Dataset`] owns a built index behind an `Arc`. Every derived view holds
//! row positions plus a handle to the dataset, so views are cheap to clone,
//! immutable, and stay valid when later queries or groupings fail.
//!
//! ```text
//! Dataset ──query──▶ Selection ──query──▶ Selection ...
//!    │                   │
//!    └──group──┐   ┌─────┘group
//!              ▼   ▼
//!             Grouped ──select──▶ GroupSelection
//!                │                     │
//!                └──────aggregate──────┴──▶ AggregateResult
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use measureset::{Dataset, Statistic};
//!
//! fn main() -> measureset::Result<()> {
//!     let (dataset, _report) = Dataset::open("runs/2024-05-01")?;
//!
//!     let result = dataset
//!         .query("voltage >= 0.5")?
//!         .group(&["voltage"])?
//!         .select(&[0])?
//!         .aggregate(Statistic::Mean)?;
//!
//!     for group in result.iter() {
//!         println!("{}: {} members", group.key, group.members);
//!     }
//!     Ok(())
//! }
//! ```

use crate::aggregate::{AggregateResult, AggregationResult, Aggregator, Statistic};
use crate::config::Config;
use crate::error::Result;
use crate::group::{Group, GroupResult, GroupedIndex};
use crate::index::{BuildReport, IndexOptions, MetadataIndex, MetadataRecord};
use crate::payload::{
    default_registry, LoaderRegistry, Payload, PayloadLoader, PayloadResult, Pipeline,
};
use crate::query::{QueryEngine, QueryResult};
use std::path::Path;
use std::sync::Arc;

/// A built metadata index plus the means to load its payloads
#[derive(Clone, Debug)]
pub struct Dataset {
    index: Arc<MetadataIndex>,
    aggregator: Aggregator,
}

impl Dataset {
    /// Index a storage location with default settings
    pub fn open(location: impl AsRef<Path>) -> Result<(Self, BuildReport)> {
        let (index, report) = MetadataIndex::build(location)?;
        Ok((Self::from_index(index), report))
    }

    /// Index the configured storage location with the configured loaders
    pub fn open_with_config(config: &Config) -> Result<(Self, BuildReport)> {
        let options: IndexOptions = config.storage.index_options();
        let (index, report) = MetadataIndex::build_with(&config.storage.data_dir, &options)?;

        let loaders = LoaderRegistry::with_defaults(&config.payload.axis_column);
        let dataset = Self::from_index(index)
            .with_loader(Arc::new(loaders))
            .with_parallelism(config.aggregate.parallelism);
        Ok((dataset, report))
    }

    /// Wrap an existing index, loading payloads with the built-in loaders
    pub fn from_index(index: MetadataIndex) -> Self {
        Self {
            index: Arc::new(index),
            aggregator: Aggregator::new(Arc::new(default_registry())),
        }
    }

    /// Replace the payload loader
    pub fn with_loader(mut self, loader: Arc<dyn PayloadLoader>) -> Self {
        self.aggregator = self.aggregator.with_loader(loader);
        self
    }

    /// Analysis steps run on each member payload before aggregation
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.aggregator = self.aggregator.with_pipeline(pipeline);
        self
    }

    /// Payloads loaded at once during aggregation
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.aggregator = self.aggregator.with_parallelism(threads);
        self
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    /// Selection of every record
    pub fn all(&self) -> Selection {
        Selection {
            dataset: self.clone(),
            rows: (0..self.index.size()).collect(),
        }
    }

    /// Filter every record
    pub fn query(&self, expression: &str) -> QueryResult<Selection> {
        self.all().query(expression)
    }

    /// Group every record
    pub fn group<S: AsRef<str>>(&self, fields: &[S]) -> GroupResult<Grouped> {
        self.all().group(fields)
    }

    /// Load the payload of one record
    pub fn load(&self, record: &MetadataRecord) -> PayloadResult<Payload> {
        self.aggregator.loader().load(record)
    }
}

/// Records of a dataset that passed a chain of filters
#[derive(Clone, Debug)]
pub struct Selection {
    dataset: Dataset,
    rows: Arc<[usize]>,
}

impl Selection {
    /// Record positions, in index order
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Selected records, in order
    pub fn records(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.rows
            .iter()
            .filter_map(move |&i| self.dataset.index.record(i))
    }

    /// Narrow this selection further
    pub fn query(&self, expression: &str) -> QueryResult<Selection> {
        let rows = QueryEngine::new(&self.dataset.index).evaluate_rows(&self.rows, expression)?;
        Ok(Selection {
            dataset: self.dataset.clone(),
            rows: rows.into(),
        })
    }

    /// Group the selected records
    pub fn group<S: AsRef<str>>(&self, fields: &[S]) -> GroupResult<Grouped> {
        let grouped = GroupedIndex::build(&self.dataset.index, &self.rows, fields)?;
        Ok(Grouped {
            dataset: self.dataset.clone(),
            grouped: Arc::new(grouped),
        })
    }
}

/// A grouping of a selection
#[derive(Clone, Debug)]
pub struct Grouped {
    dataset: Dataset,
    grouped: Arc<GroupedIndex>,
}

impl Grouped {
    pub fn grouped(&self) -> &GroupedIndex {
        &self.grouped
    }

    pub fn groups(&self) -> &[Group] {
        self.grouped.groups()
    }

    pub fn len(&self) -> usize {
        self.grouped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grouped.is_empty()
    }

    /// Pick groups by index
    pub fn select(&self, indices: &[usize]) -> GroupResult<GroupSelection> {
        let indices = self.grouped.select(indices)?;
        Ok(GroupSelection {
            grouped: self.clone(),
            indices,
        })
    }

    /// Aggregate every group
    pub fn aggregate(&self, statistic: Statistic) -> AggregationResult<AggregateResult> {
        self.aggregate_groups(&self.grouped.all(), statistic)
    }

    fn aggregate_groups(
        &self,
        indices: &[usize],
        statistic: Statistic,
    ) -> AggregationResult<AggregateResult> {
        self.dataset
            .aggregator
            .aggregate(&self.dataset.index, &self.grouped, indices, statistic)
    }
}

/// Some groups of a grouping
#[derive(Clone, Debug)]
pub struct GroupSelection {
    grouped: Grouped,
    indices: Vec<usize>,
}

impl GroupSelection {
    /// Selected group indices, sorted
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Member records of every selected group, by group
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.indices
            .iter()
            .filter_map(move |&i| self.grouped.grouped.group(i))
    }

    pub fn aggregate(&self, statistic: Statistic) -> AggregationResult<AggregateResult> {
        self.grouped.aggregate_groups(&self.indices, statistic)
    }
}
