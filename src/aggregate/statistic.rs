//! Per-point statistics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reduction applied across a group's payloads at each axis position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Arithmetic mean
    #[default]
    Mean,
    Median,
    Min,
    Max,
    Sum,
    /// Population standard deviation
    Std,
}

impl Statistic {
    pub const ALL: [Statistic; 6] = [
        Statistic::Mean,
        Statistic::Median,
        Statistic::Min,
        Statistic::Max,
        Statistic::Sum,
        Statistic::Std,
    ];

    /// Apply to the samples present at one point; `None` when there are none
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let result = match self {
            Self::Mean => values.iter().sum::<f64>() / n,
            Self::Sum => values.iter().sum(),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Self::Std => {
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                var.sqrt()
            }
        };
        Some(result)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Std => "std",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Statistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "avg" | "average" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            "std" | "stddev" => Ok(Self::Std),
            other => Err(format!(
                "unknown statistic '{}' (expected one of: mean, median, min, max, sum, std)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        let values = [1.0, 2.0, 3.0, 6.0];
        assert_eq!(Statistic::Mean.apply(&values), Some(3.0));
        assert_eq!(Statistic::Sum.apply(&values), Some(12.0));
        assert_eq!(Statistic::Min.apply(&values), Some(1.0));
        assert_eq!(Statistic::Max.apply(&values), Some(6.0));
        assert_eq!(Statistic::Median.apply(&values), Some(2.5));
        assert_eq!(Statistic::Median.apply(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(Statistic::Std.apply(&[2.0, 4.0]), Some(1.0));
        assert_eq!(Statistic::Mean.apply(&[]), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("AVG".parse::<Statistic>(), Ok(Statistic::Mean));
        assert_eq!("stddev".parse::<Statistic>(), Ok(Statistic::Std));
        assert!("mode".parse::<Statistic>().is_err());
        for stat in Statistic::ALL {
            assert_eq!(stat.name().parse::<Statistic>(), Ok(stat));
        }
    }
}
