//! Group aggregation
//!
//! For each selected group every member payload is loaded and run through
//! the analysis [`Pipeline`], the payloads are aligned by axis position, and
//! each channel is reduced point by point.
//!
//! # Alignment
//!
//! ```text
//! member 0: ●●●●●●●●●●  (10 points)
//! member 1: ●●●●●●●●    ( 8 points)
//! member 2: ●●●●●●●●●   ( 9 points)
//!           ────────
//! result:   ●●●●●●●●    truncated to 8, axis of member 0
//! ```
//!
//! There is no resampling. Payloads whose axes differ are combined by
//! position, and the outcome is recorded in [`Alignment`]. Non-finite
//! samples are left out of a point, which lowers that point's count.

use crate::aggregate::error::{AggregateError, AggregationResult};
use crate::aggregate::statistic::Statistic;
use crate::group::{Group, GroupKey, GroupedIndex};
use crate::index::{MetadataIndex, MetadataRecord};
use crate::payload::{Payload, PayloadLoader, Pipeline};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// How a group's member axes lined up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alignment {
    /// Every member has the same axis
    Identical,
    /// Same length, different sample points; combined by position
    Positional,
    /// Lengths differ; everything past the shortest member is dropped
    Truncated { shortest: usize, longest: usize },
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alignment::Identical => write!(f, "identical"),
            Alignment::Positional => write!(f, "positional"),
            Alignment::Truncated { shortest, longest } => {
                write!(f, "truncated ({}..{})", shortest, longest)
            }
        }
    }
}

/// Reduced curve of one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelCurve {
    /// Statistic per axis point (NaN where no member had a sample)
    pub values: Vec<f64>,
    /// Number of members contributing to each point
    pub counts: Vec<usize>,
}

/// Aggregate of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub group: usize,
    pub key: GroupKey,
    pub statistic: Statistic,
    /// Number of member payloads
    pub members: usize,
    pub axis_name: String,
    /// Axis of the first member, truncated to the common length
    pub axis: Vec<f64>,
    pub alignment: Alignment,
    pub channels: BTreeMap<String, ChannelCurve>,
}

impl GroupAggregate {
    /// Number of axis points
    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelCurve> {
        self.channels.get(name)
    }
}

/// Group index → aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub statistic: Statistic,
    pub groups: BTreeMap<usize, GroupAggregate>,
}

impl AggregateResult {
    pub fn get(&self, group: usize) -> Option<&GroupAggregate> {
        self.groups.get(&group)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupAggregate> {
        self.groups.values()
    }
}

/// Loads and reduces group payloads
#[derive(Clone)]
pub struct Aggregator {
    loader: Arc<dyn PayloadLoader>,
    pipeline: Pipeline,
    parallelism: usize,
}

impl Aggregator {
    /// Aggregator loading one payload at a time
    pub fn new(loader: Arc<dyn PayloadLoader>) -> Self {
        Self {
            loader,
            pipeline: Pipeline::new(),
            parallelism: 1,
        }
    }

    /// Replace the payload loader
    pub fn with_loader(mut self, loader: Arc<dyn PayloadLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Run `pipeline` on every member payload before reducing
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Load up to `threads` payloads at once; 0 uses every available core
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = if threads == 0 {
            std::thread::available_parallelism()
                .map(|v| v.get())
                .unwrap_or(4)
        } else {
            threads
        };
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn loader(&self) -> &dyn PayloadLoader {
        self.loader.as_ref()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Aggregate the selected groups of a grouping of `index`
    pub fn aggregate(
        &self,
        index: &MetadataIndex,
        grouped: &GroupedIndex,
        selection: &[usize],
        statistic: Statistic,
    ) -> AggregationResult<AggregateResult> {
        let mut groups = Vec::with_capacity(selection.len());
        for &g in selection {
            let group = grouped.group(g).ok_or(AggregateError::UnknownGroup {
                index: g,
                groups: grouped.len(),
            })?;
            groups.push(group);
        }

        let mut result = AggregateResult {
            statistic,
            groups: BTreeMap::new(),
        };
        for group in groups {
            if result.groups.contains_key(&group.index) {
                continue;
            }
            let aggregate = self.aggregate_group(index, group, statistic)?;
            result.groups.insert(group.index, aggregate);
        }

        Ok(result)
    }

    /// Aggregate a single group
    pub fn aggregate_group(
        &self,
        index: &MetadataIndex,
        group: &Group,
        statistic: Statistic,
    ) -> AggregationResult<GroupAggregate> {
        if group.rows.is_empty() {
            return Err(AggregateError::EmptyGroup { group: group.index });
        }

        let start = Instant::now();
        let records: Vec<&MetadataRecord> =
            group.rows.iter().filter_map(|&r| index.record(r)).collect();
        if records.is_empty() {
            return Err(AggregateError::EmptyGroup { group: group.index });
        }

        let payloads = self.load_all(&records)?;
        let aggregate = reduce(group, &records, &payloads, statistic)?;

        tracing::debug!(
            group = group.index,
            key = %group.key,
            members = aggregate.members,
            points = aggregate.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Aggregated group"
        );

        Ok(aggregate)
    }

    /// Load and analyse payloads in member order, in parallel when configured
    fn load_all(&self, records: &[&MetadataRecord]) -> AggregationResult<Vec<Payload>> {
        let load = |record: &&MetadataRecord| {
            self.loader
                .load(record)
                .and_then(|payload| self.pipeline.run(record, payload))
                .map_err(|e| AggregateError::Payload {
                    record: record.label(),
                    source: e,
                })
        };

        let threads = self.parallelism.min(records.len());
        let results: Vec<AggregationResult<Payload>> = if threads > 1 {
            ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map(|pool| pool.install(|| records.par_iter().map(load).collect()))
                .unwrap_or_else(|_| records.iter().map(load).collect())
        } else {
            records.iter().map(load).collect()
        };

        results.into_iter().collect()
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("format", &self.loader.format())
            .field("pipeline", &self.pipeline.names())
            .field("parallelism", &self.parallelism)
            .finish()
    }
}

fn reduce(
    group: &Group,
    records: &[&MetadataRecord],
    payloads: &[Payload],
    statistic: Statistic,
) -> AggregationResult<GroupAggregate> {
    let Some(first) = payloads.first() else {
        return Err(AggregateError::EmptyGroup { group: group.index });
    };

    let expected: Vec<&str> = first.channel_names();
    for (record, payload) in records.iter().zip(payloads).skip(1) {
        let found = payload.channel_names();
        if found != expected {
            return Err(AggregateError::ChannelMismatch {
                group: group.index,
                record: record.label(),
                expected: expected.iter().map(|s| s.to_string()).collect(),
                found: found.iter().map(|s| s.to_string()).collect(),
            });
        }
    }

    let alignment = alignment_of(payloads);
    let length = payloads.iter().map(Payload::len).min().unwrap_or(0);
    if alignment != Alignment::Identical {
        tracing::warn!(
            group = group.index,
            key = %group.key,
            alignment = %alignment,
            length,
            "Member axes differ, combining by position"
        );
    }

    let mut channels = BTreeMap::new();
    let mut samples = Vec::with_capacity(payloads.len());
    for name in &expected {
        let columns: Vec<&[f64]> = payloads
            .iter()
            .filter_map(|p| p.channel(name))
            .collect();

        let mut values = Vec::with_capacity(length);
        let mut counts = Vec::with_capacity(length);
        for i in 0..length {
            samples.clear();
            samples.extend(columns.iter().map(|c| c[i]).filter(|v| v.is_finite()));
            counts.push(samples.len());
            values.push(statistic.apply(&samples).unwrap_or(f64::NAN));
        }

        channels.insert(name.to_string(), ChannelCurve { values, counts });
    }

    Ok(GroupAggregate {
        group: group.index,
        key: group.key.clone(),
        statistic,
        members: payloads.len(),
        axis_name: first.axis_name().to_string(),
        axis: first.axis()[..length].to_vec(),
        alignment,
        channels,
    })
}

fn alignment_of(payloads: &[Payload]) -> Alignment {
    let shortest = payloads.iter().map(Payload::len).min().unwrap_or(0);
    let longest = payloads.iter().map(Payload::len).max().unwrap_or(0);
    if shortest != longest {
        return Alignment::Truncated { shortest, longest };
    }

    let Some(first) = payloads.first() else {
        return Alignment::Identical;
    };
    let same_axis = payloads.iter().skip(1).all(|p| {
        p.axis()
            .iter()
            .zip(first.axis())
            .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    });

    if same_axis {
        Alignment::Identical
    } else {
        Alignment::Positional
    }
}
