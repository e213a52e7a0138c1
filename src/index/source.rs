//! Metadata sources
//!
//! A source enumerates a storage location and yields one raw (untyped) record
//! per measurement, in a deterministic order. Typing happens later, per
//! column, once every record has been seen.
//!
//! - [`MetaTableSource`]: rows of the `meta_data.csv` table
//! - [`HeaderScanSource`]: ekpy headings of every `*.csv` file, by file name

use crate::index::error::{IndexError, IndexResult};
use crate::index::record::PayloadRef;
use crate::storage::read_heading;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which source produced an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    MetaTable,
    HeaderScan,
    /// Records handed over programmatically
    InMemory,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::MetaTable => write!(f, "metadata table"),
            SourceKind::HeaderScan => write!(f, "header scan"),
            SourceKind::InMemory => write!(f, "in-memory"),
        }
    }
}

/// One record as read from storage, before typing
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Where the record came from (table line or file name)
    pub label: String,
    /// `(field, cell)` pairs in source order
    pub cells: Vec<(String, String)>,
    /// Payload of the record
    pub payload: PayloadRef,
}

/// Everything a source produced from one scan
#[derive(Debug, Default)]
pub struct SourceScan {
    /// Parsed records in scan order
    pub records: Vec<RawRecord>,
    /// Records that were skipped
    pub malformed: Vec<IndexError>,
}

/// Enumerates a storage location into raw records
pub trait MetadataSource {
    /// Kind reported in build summaries
    fn kind(&self) -> SourceKind;

    /// Scan the location. Per-record problems go into
    /// [`SourceScan::malformed`]; only location-level failures are errors.
    fn scan(&self, location: &Path) -> IndexResult<SourceScan>;
}

/// Reads the per-directory metadata table
#[derive(Debug, Clone)]
pub struct MetaTableSource {
    /// Table file name inside the location
    pub file_name: String,
    /// Column naming each row's payload file
    pub filename_field: String,
}

impl MetaTableSource {
    pub fn new(file_name: impl Into<String>, filename_field: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            filename_field: filename_field.into(),
        }
    }
}

impl MetadataSource for MetaTableSource {
    fn kind(&self) -> SourceKind {
        SourceKind::MetaTable
    }

    fn scan(&self, location: &Path) -> IndexResult<SourceScan> {
        let table = location.join(&self.file_name);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&table)
            .map_err(|e| IndexError::unreadable(&table, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| IndexError::unreadable(&table, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let filename_col = headers
            .iter()
            .position(|h| h == &self.filename_field)
            .ok_or_else(|| {
                IndexError::unreadable(
                    &table,
                    format!("no '{}' column in metadata table", self.filename_field),
                )
            })?;

        let mut scan = SourceScan::default();

        for (idx, result) in reader.records().enumerate() {
            let label = format!("{} line {}", self.file_name, idx + 2);

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    scan.malformed.push(IndexError::malformed(label, e));
                    continue;
                }
            };

            let filename = row.get(filename_col).unwrap_or("").trim();
            if filename.is_empty() {
                scan.malformed.push(IndexError::malformed(
                    label,
                    format!("empty '{}' field", self.filename_field),
                ));
                continue;
            }

            let cells = headers
                .iter()
                .zip(row.iter())
                .map(|(h, cell)| (h.clone(), cell.to_string()))
                .collect();

            scan.records.push(RawRecord {
                label,
                cells,
                payload: PayloadRef::from_path(location.join(filename)),
            });
        }

        Ok(scan)
    }
}

/// Builds records from the ekpy headings of the payload files themselves
#[derive(Debug, Clone, Default)]
pub struct HeaderScanSource {
    /// File names to leave out (the metadata table, for one)
    pub exclude: Vec<String>,
}

impl HeaderScanSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: skip a file name
    pub fn exclude(mut self, file_name: impl Into<String>) -> Self {
        self.exclude.push(file_name.into());
        self
    }

    fn candidates(&self, location: &Path) -> IndexResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(location).map_err(|e| IndexError::unreadable(location, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| IndexError::unreadable(location, e))?.path();
            if !path.is_file() {
                continue;
            }
            let is_csv = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            let excluded = path
                .file_name()
                .map(|n| self.exclude.iter().any(|x| n == x.as_str()))
                .unwrap_or(true);
            if is_csv && !excluded {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

impl MetadataSource for HeaderScanSource {
    fn kind(&self) -> SourceKind {
        SourceKind::HeaderScan
    }

    fn scan(&self, location: &Path) -> IndexResult<SourceScan> {
        let mut scan = SourceScan::default();

        for path in self.candidates(location)? {
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            match read_heading(&path) {
                Ok(Some(heading)) => scan.records.push(RawRecord {
                    label,
                    cells: heading,
                    payload: PayloadRef::from_path(path),
                }),
                Ok(None) => scan
                    .malformed
                    .push(IndexError::malformed(label, "no ekpy heading")),
                Err(e) => scan.malformed.push(IndexError::malformed(label, e)),
            }
        }

        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_meta_table_rows_in_order() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("meta_data.csv"),
            "voltage,sample,trial,filename\n0.5,D0,0,p_0.csv\n1.0,D0,1,p_1.csv\n0.5,D1,2,\n",
        )
        .unwrap();

        let scan = MetaTableSource::new("meta_data.csv", "filename")
            .scan(dir.path())
            .unwrap();

        assert_eq!(scan.records.len(), 2);
        assert_eq!(scan.records[0].payload.path, dir.path().join("p_0.csv"));
        assert_eq!(scan.records[1].cells[0], ("voltage".to_string(), "1.0".to_string()));
        assert_eq!(scan.malformed.len(), 1);
        assert!(matches!(
            &scan.malformed[0],
            IndexError::MetadataMalformed { record, .. } if record == "meta_data.csv line 4"
        ));
    }

    #[test]
    fn test_meta_table_ragged_row_is_malformed() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("meta_data.csv"),
            "voltage,filename\n0.5,a.csv\n1.0,b.csv,extra\n",
        )
        .unwrap();

        let scan = MetaTableSource::new("meta_data.csv", "filename")
            .scan(dir.path())
            .unwrap();
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.malformed.len(), 1);
    }

    #[test]
    fn test_meta_table_missing_is_unreadable() {
        let dir = tempdir().unwrap();
        let result = MetaTableSource::new("meta_data.csv", "filename").scan(dir.path());
        assert!(matches!(result, Err(IndexError::StorageUnreadable { .. })));
    }

    #[test]
    fn test_header_scan_sorted_and_reports_plain_files() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("b_0.csv"),
            "ekpy_heading\nvoltage:::1.0\nekpy_heading_complete\ntime,p1\n0,1\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_0.csv"),
            "ekpy_heading\nvoltage:::0.5\nekpy_heading_complete\ntime,p1\n0,1\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("plain.csv"), "time,p1\n0,1\n").unwrap();
        std::fs::write(dir.path().join("meta_data.csv"), "x\n1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let scan = HeaderScanSource::new()
            .exclude("meta_data.csv")
            .scan(dir.path())
            .unwrap();

        let labels: Vec<&str> = scan.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["a_0.csv", "b_0.csv"]);
        assert_eq!(scan.malformed.len(), 1);
    }

    #[test]
    fn test_header_scan_missing_dir() {
        let dir = tempdir().unwrap();
        let result = HeaderScanSource::new().scan(&dir.path().join("nope"));
        assert!(matches!(result, Err(IndexError::StorageUnreadable { .. })));
    }
}
