//! Measureset Aggregation
//!
//! Reduces the payloads of selected groups to one curve per channel:
//!
//! - **statistic**: per-point reductions (mean, median, min, max, sum, std)
//! - **aggregator**: loading, alignment and reduction of group members
//! - **export**: aggregate results written back as ekpy files
//! - **error**: Error types
//!
//! # Pipeline
//!
//! ```text
//! group rows ──▶ PayloadLoader (rayon, bounded) ──▶ payloads in member order
//!                                                      │ check channel names
//!                                                      │ truncate to shortest
//!                                                      ▼
//!                                          per-point statistic + counts
//! ```

mod aggregator;
mod error;
mod export;
mod statistic;

pub use aggregator::{AggregateResult, Aggregator, Alignment, ChannelCurve, GroupAggregate};
pub use error::{AggregateError, AggregationResult};
pub use export::{export_ekpy, COUNT_SUFFIX};
pub use statistic::Statistic;
