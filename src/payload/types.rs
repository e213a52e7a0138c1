//! Payload data types

use crate::payload::error::{PayloadError, PayloadResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Axis name used when a table has none
pub const DEFAULT_AXIS: &str = "time";

/// Named numeric channels over a shared independent axis.
///
/// Every channel has one sample per axis point. A channel sampled more
/// coarsely than the axis holds NaN where it has no sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    axis_name: String,
    axis: Vec<f64>,
    channels: BTreeMap<String, Vec<f64>>,
}

impl Payload {
    /// Create a payload, checking every channel against the axis length
    pub fn new(
        axis_name: impl Into<String>,
        axis: Vec<f64>,
        channels: BTreeMap<String, Vec<f64>>,
    ) -> PayloadResult<Self> {
        for (name, values) in &channels {
            if values.len() != axis.len() {
                return Err(PayloadError::RaggedChannel {
                    channel: name.clone(),
                    expected: axis.len(),
                    found: values.len(),
                });
            }
        }

        Ok(Self {
            axis_name: axis_name.into(),
            axis,
            channels,
        })
    }

    /// Build from `(name, column)` pairs, taking `axis_column` as the axis
    /// when present and the first column otherwise
    pub fn from_columns(
        columns: Vec<(String, Vec<f64>)>,
        axis_column: &str,
    ) -> PayloadResult<Self> {
        let axis_pos = columns
            .iter()
            .position(|(name, _)| name == axis_column)
            .unwrap_or(0);

        let mut axis_name = DEFAULT_AXIS.to_string();
        let mut axis = Vec::new();
        let mut channels = BTreeMap::new();

        for (i, (name, values)) in columns.into_iter().enumerate() {
            if i == axis_pos {
                axis_name = name;
                axis = values;
            } else {
                channels.insert(name, values);
            }
        }

        Self::new(axis_name, axis, channels)
    }

    pub fn axis_name(&self) -> &str {
        &self.axis_name
    }

    pub fn axis(&self) -> &[f64] {
        &self.axis
    }

    /// Number of axis points
    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    /// Channel names, sorted
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    pub fn channels(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.channels
    }

    /// Split into axis name, axis and channels
    pub fn into_parts(self) -> (String, Vec<f64>, BTreeMap<String, Vec<f64>>) {
        (self.axis_name, self.axis, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns_axis_selection() {
        let columns = vec![
            ("p1".to_string(), vec![1.0, 2.0]),
            ("time".to_string(), vec![0.0, 1.0]),
        ];
        let payload = Payload::from_columns(columns.clone(), "time").unwrap();
        assert_eq!(payload.axis_name(), "time");
        assert_eq!(payload.channel_names(), vec!["p1"]);

        let payload = Payload::from_columns(columns, "t").unwrap();
        assert_eq!(payload.axis_name(), "p1");
        assert_eq!(payload.channel("time"), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_ragged_channel_rejected() {
        let err = Payload::new(
            "time",
            vec![0.0, 1.0],
            BTreeMap::from([("p1".to_string(), vec![1.0])]),
        )
        .unwrap_err();
        assert!(matches!(err, PayloadError::RaggedChannel { expected: 2, found: 1, .. }));
    }
}
