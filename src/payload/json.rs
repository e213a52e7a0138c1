//! Loader for column-oriented JSON payloads
//!
//! ```text
//! {"time": [0.0, 1.0, 2.0], "p1": [0.1, null, 0.3]}
//! ```
//!
//! `null` reads as NaN. Without the configured axis column the
//! alphabetically first column is the axis.

use crate::index::MetadataRecord;
use crate::payload::error::{PayloadError, PayloadResult};
use crate::payload::types::{Payload, DEFAULT_AXIS};
use crate::payload::PayloadLoader;
use std::collections::BTreeMap;

/// Reads `json` payloads
#[derive(Debug, Clone)]
pub struct JsonLoader {
    axis_column: String,
}

impl JsonLoader {
    pub fn new(axis_column: impl Into<String>) -> Self {
        Self {
            axis_column: axis_column.into(),
        }
    }
}

impl Default for JsonLoader {
    fn default() -> Self {
        Self::new(DEFAULT_AXIS)
    }
}

impl PayloadLoader for JsonLoader {
    fn format(&self) -> &str {
        "json"
    }

    fn load(&self, record: &MetadataRecord) -> PayloadResult<Payload> {
        let path = record.payload.path();
        let text = std::fs::read_to_string(path).map_err(|e| PayloadError::unreadable(path, e))?;

        let table: BTreeMap<String, Vec<Option<f64>>> =
            serde_json::from_str(&text).map_err(|e| PayloadError::unreadable(path, e))?;
        if table.is_empty() {
            return Err(PayloadError::unreadable(path, "table has no columns"));
        }

        let columns = table
            .into_iter()
            .map(|(name, cells)| {
                let values = cells.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                (name, values)
            })
            .collect();

        Payload::from_columns(columns, &self.axis_column)
            .map_err(|e| PayloadError::unreadable(path, e))
    }
}
