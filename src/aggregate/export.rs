//! Export of aggregate results as ekpy data files
//!
//! One file per group, `<base>_group<n>.csv`:
//!
//! ```text
//! ekpy_heading
//! statistic:::mean
//! group:::0
//! members:::3
//! alignment:::identical
//! voltage:::0.5
//! ekpy_heading_complete
//! time,p1,p1_count
//! ```

use crate::aggregate::aggregator::{AggregateResult, GroupAggregate};
use crate::aggregate::error::{AggregateError, AggregationResult};
use crate::storage::write_ekpy_data;
use std::path::{Path, PathBuf};

/// Suffix of the per-point count column written next to each channel
pub const COUNT_SUFFIX: &str = "_count";

/// Write every group of `result` into `dir`, returning the written paths
pub fn export_ekpy(
    result: &AggregateResult,
    dir: &Path,
    base: &str,
) -> AggregationResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| AggregateError::Export {
        path: dir.to_path_buf(),
        source: e.into(),
    })?;

    let mut written = Vec::with_capacity(result.len());
    for aggregate in result.iter() {
        let path = dir.join(format!("{}_group{}.csv", base, aggregate.group));
        write_group(&path, aggregate)?;
        written.push(path);
    }

    tracing::info!(
        dir = %dir.display(),
        files = written.len(),
        "Exported aggregate result"
    );
    Ok(written)
}

fn write_group(path: &Path, aggregate: &GroupAggregate) -> AggregationResult<()> {
    let mut heading: Vec<(String, String)> = vec![
        ("statistic".to_string(), aggregate.statistic.to_string()),
        ("group".to_string(), aggregate.group.to_string()),
        ("members".to_string(), aggregate.members.to_string()),
        ("alignment".to_string(), aggregate.alignment.to_string()),
    ];
    for (name, value) in aggregate.key.pairs() {
        heading.push((name.clone(), value.to_string()));
    }

    let counts: Vec<(String, Vec<f64>)> = aggregate
        .channels
        .iter()
        .map(|(name, curve)| {
            (
                format!("{name}{COUNT_SUFFIX}"),
                curve.counts.iter().map(|&c| c as f64).collect(),
            )
        })
        .collect();

    let mut columns: Vec<(&str, &[f64])> = vec![(aggregate.axis_name.as_str(), &aggregate.axis[..])];
    for ((name, curve), (count_name, count)) in aggregate.channels.iter().zip(&counts) {
        columns.push((name.as_str(), &curve.values[..]));
        columns.push((count_name.as_str(), &count[..]));
    }

    write_ekpy_data(path, &heading, &columns).map_err(|source| AggregateError::Export {
        path: path.to_path_buf(),
        source,
    })
}
