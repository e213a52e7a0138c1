//! Loader for ekpy data files and plain CSV tables

use crate::index::MetadataRecord;
use crate::payload::error::{PayloadError, PayloadResult};
use crate::payload::types::{Payload, DEFAULT_AXIS};
use crate::payload::PayloadLoader;
use crate::storage::read_ekpy_data;

/// Reads `csv` payloads, with or without an ekpy heading
#[derive(Debug, Clone)]
pub struct EkpyLoader {
    axis_column: String,
}

impl EkpyLoader {
    pub fn new(axis_column: impl Into<String>) -> Self {
        Self {
            axis_column: axis_column.into(),
        }
    }
}

impl Default for EkpyLoader {
    fn default() -> Self {
        Self::new(DEFAULT_AXIS)
    }
}

impl PayloadLoader for EkpyLoader {
    fn format(&self) -> &str {
        "csv"
    }

    fn load(&self, record: &MetadataRecord) -> PayloadResult<Payload> {
        let path = record.payload.path();
        let data = read_ekpy_data(path).map_err(|e| PayloadError::unreadable(path, e))?;

        if data.columns.is_empty() {
            return Err(PayloadError::unreadable(path, "table has no columns"));
        }

        Payload::from_columns(data.into_columns(), &self.axis_column)
            .map_err(|e| PayloadError::unreadable(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PayloadRef;
    use tempfile::tempdir;

    #[test]
    fn test_load_ekpy_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pulse_0.csv");
        std::fs::write(
            &path,
            "ekpy_heading\nvoltage:::0.5\nekpy_heading_complete\np1,time,p2\n1.0,0,\n2.0,1,5\n",
        )
        .unwrap();

        let record = MetadataRecord::new(PayloadRef::from_path(&path));
        let payload = EkpyLoader::default().load(&record).unwrap();

        assert_eq!(payload.axis_name(), "time");
        assert_eq!(payload.axis(), &[0.0, 1.0]);
        assert_eq!(payload.channel("p1"), Some(&[1.0, 2.0][..]));
        assert!(payload.channel("p2").unwrap()[0].is_nan());
    }

    #[test]
    fn test_plain_csv_uses_first_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        std::fs::write(&path, "t,p1\n0,1\n1,2\n").unwrap();

        let record = MetadataRecord::new(PayloadRef::from_path(&path));
        let payload = EkpyLoader::default().load(&record).unwrap();
        assert_eq!(payload.axis_name(), "t");
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = tempdir().unwrap();
        let record = MetadataRecord::new(PayloadRef::from_path(dir.path().join("gone.csv")));
        let err = EkpyLoader::default().load(&record).unwrap_err();
        assert!(matches!(err, PayloadError::Unreadable { .. }));
    }
}
