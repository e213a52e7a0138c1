//! The metadata index
//!
//! Built once from a storage scan and read-only afterwards. Every derived
//! view (query selections, groupings) refers to records by their position in
//! [`MetadataIndex::records`].
//!
//! # Build
//!
//! ```text
//! location/
//!   meta_data.csv present? ──yes──▶ MetaTableSource
//!           │
//!           no ───────────────────▶ HeaderScanSource (*.csv, by name)
//!                                        │
//!                raw records ◀───────────┘
//!                    │  drop duplicate payload references
//!                    │  infer one kind per field
//!                    ▼
//!              MetadataIndex + BuildReport (skipped records)
//! ```

use crate::index::error::{IndexError, IndexResult};
use crate::index::record::MetadataRecord;
use crate::index::source::{
    HeaderScanSource, MetaTableSource, MetadataSource, RawRecord, SourceKind, SourceScan,
};
use crate::index::value::{FieldKind, FieldValue};
use crate::storage::{FILENAME_FIELD, META_DATA_FILE};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Options controlling how a storage location is scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Metadata table file name
    pub meta_data_file: String,
    /// Table column that names each record's payload file
    pub filename_field: String,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            meta_data_file: META_DATA_FILE.to_string(),
            filename_field: FILENAME_FIELD.to_string(),
        }
    }
}

/// Outcome of an index build, returned next to the index
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Source that produced the records
    pub source: SourceKind,
    /// Records that made it into the index
    pub indexed: usize,
    /// Records that were skipped, with the reason
    pub malformed: Vec<IndexError>,
}

impl BuildReport {
    /// True when no record was skipped
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty()
    }
}

/// Summary of an index, for display
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub location: PathBuf,
    pub source: SourceKind,
    pub records: usize,
    pub fields: usize,
    /// Format tag → number of payloads
    pub payload_formats: BTreeMap<String, usize>,
    pub built_at: DateTime<Utc>,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index Statistics:")?;
        writeln!(f, "  Location: {}", self.location.display())?;
        writeln!(f, "  Source: {}", self.source)?;
        writeln!(f, "  Records: {}", self.records)?;
        writeln!(f, "  Fields: {}", self.fields)?;
        for (format, count) in &self.payload_formats {
            writeln!(f, "  Payloads ({}): {}", format, count)?;
        }
        write!(f, "  Built: {}", self.built_at.to_rfc3339())
    }
}

/// Ordered, immutable collection of metadata records
#[derive(Debug, Clone)]
pub struct MetadataIndex {
    location: PathBuf,
    source: SourceKind,
    records: Vec<MetadataRecord>,
    schema: BTreeMap<String, FieldKind>,
    built_at: DateTime<Utc>,
}

impl MetadataIndex {
    /// Scan a storage location with default options
    pub fn build(location: impl AsRef<Path>) -> IndexResult<(Self, BuildReport)> {
        Self::build_with(location, &IndexOptions::default())
    }

    /// Scan a storage location.
    ///
    /// Uses the metadata table when it exists and falls back to scanning the
    /// headings of the payload files otherwise.
    pub fn build_with(
        location: impl AsRef<Path>,
        options: &IndexOptions,
    ) -> IndexResult<(Self, BuildReport)> {
        let location = location.as_ref();

        let meta = std::fs::metadata(location).map_err(|e| IndexError::unreadable(location, e))?;
        if !meta.is_dir() {
            return Err(IndexError::unreadable(location, "not a directory"));
        }

        if location.join(&options.meta_data_file).is_file() {
            let source =
                MetaTableSource::new(options.meta_data_file.clone(), options.filename_field.clone());
            Self::from_source(location, &source)
        } else {
            let source = HeaderScanSource::new().exclude(options.meta_data_file.clone());
            Self::from_source(location, &source)
        }
    }

    /// Build from an explicit source
    pub fn from_source(
        location: impl AsRef<Path>,
        source: &dyn MetadataSource,
    ) -> IndexResult<(Self, BuildReport)> {
        let location = location.as_ref();
        let scan = source.scan(location)?;
        Self::assemble(location, source.kind(), scan)
    }

    /// Build from records created in memory.
    ///
    /// Fields missing from a record are filled in as absent. Unlike a storage
    /// scan nothing is skipped: a duplicate payload reference or a field
    /// holding two kinds of value is an error.
    pub fn from_records(
        location: impl Into<PathBuf>,
        records: Vec<MetadataRecord>,
    ) -> IndexResult<Self> {
        let location = location.into();
        if records.is_empty() {
            return Err(IndexError::EmptyIndex {
                location,
                malformed: Vec::new(),
            });
        }

        let mut schema: BTreeMap<String, FieldKind> = BTreeMap::new();
        let mut payloads = HashSet::new();

        for record in &records {
            if !payloads.insert(record.payload.path.clone()) {
                return Err(IndexError::malformed(
                    record.label(),
                    "duplicate payload reference",
                ));
            }
            for (name, value) in &record.fields {
                let kind = schema.entry(name.clone()).or_insert(FieldKind::Empty);
                match (*kind, value.kind()) {
                    (_, FieldKind::Empty) => {}
                    (FieldKind::Empty, found) => *kind = found,
                    (expected, found) if expected != found => {
                        return Err(IndexError::MixedFieldKinds {
                            field: name.clone(),
                            expected,
                            found,
                            record: record.label(),
                        });
                    }
                    _ => {}
                }
            }
        }

        let records = records
            .into_iter()
            .map(|mut record| {
                for name in schema.keys() {
                    record
                        .fields
                        .entry(name.clone())
                        .or_insert(FieldValue::Absent);
                }
                record
            })
            .collect();

        Ok(Self {
            location,
            source: SourceKind::InMemory,
            records,
            schema,
            built_at: Utc::now(),
        })
    }

    fn assemble(
        location: &Path,
        source: SourceKind,
        scan: SourceScan,
    ) -> IndexResult<(Self, BuildReport)> {
        let SourceScan {
            records: raw,
            mut malformed,
        } = scan;

        let mut payloads = HashSet::new();
        let mut kept: Vec<(RawRecord, HashMap<String, String>)> = Vec::with_capacity(raw.len());

        for record in raw {
            if !payloads.insert(record.payload.path.clone()) {
                malformed.push(IndexError::malformed(
                    record.label.as_str(),
                    format!("duplicate payload reference {}", record.payload),
                ));
                continue;
            }

            let mut cells = HashMap::with_capacity(record.cells.len());
            for (name, cell) in &record.cells {
                if name.is_empty() {
                    continue;
                }
                cells.entry(name.clone()).or_insert_with(|| cell.clone());
            }
            kept.push((record, cells));
        }

        for err in &malformed {
            tracing::warn!(error = %err, "Skipping metadata record");
        }

        if kept.is_empty() {
            return Err(IndexError::EmptyIndex {
                location: location.to_path_buf(),
                malformed,
            });
        }

        let names: BTreeSet<&str> = kept
            .iter()
            .flat_map(|(_, cells)| cells.keys().map(String::as_str))
            .collect();

        let schema: BTreeMap<String, FieldKind> = names
            .into_iter()
            .map(|name| {
                let column = kept
                    .iter()
                    .filter_map(|(_, cells)| cells.get(name).map(String::as_str));
                (name.to_string(), FieldKind::infer(column))
            })
            .collect();

        let records: Vec<MetadataRecord> = kept
            .into_iter()
            .map(|(raw, cells)| {
                let fields = schema
                    .iter()
                    .map(|(name, kind)| {
                        let value = cells
                            .get(name)
                            .map(|cell| kind.parse(cell))
                            .unwrap_or(FieldValue::Absent);
                        (name.clone(), value)
                    })
                    .collect();
                MetadataRecord {
                    fields,
                    payload: raw.payload,
                }
            })
            .collect();

        tracing::info!(
            location = %location.display(),
            source = %source,
            records = records.len(),
            fields = schema.len(),
            skipped = malformed.len(),
            "Built metadata index"
        );

        let report = BuildReport {
            source,
            indexed: records.len(),
            malformed,
        };

        let index = Self {
            location: location.to_path_buf(),
            source,
            records,
            schema,
            built_at: Utc::now(),
        };

        Ok((index, report))
    }

    /// Storage location the index was built from
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Field names present in the index, sorted
    pub fn fields(&self) -> BTreeSet<&str> {
        self.schema.keys().map(String::as_str).collect()
    }

    /// Field name → inferred kind
    pub fn schema(&self) -> &BTreeMap<String, FieldKind> {
        &self.schema
    }

    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.schema.get(name).copied()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.schema.contains_key(name)
    }

    /// Record at position `i`
    pub fn record(&self, i: usize) -> Option<&MetadataRecord> {
        self.records.get(i)
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    /// Number of records
    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct values of a field among the given rows, sorted
    pub fn distinct_values<'a>(
        &'a self,
        field: &str,
        rows: impl IntoIterator<Item = usize>,
    ) -> BTreeSet<&'a FieldValue> {
        rows.into_iter()
            .filter_map(|i| self.records.get(i))
            .map(|r| r.get(field))
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let mut payload_formats = BTreeMap::new();
        for record in &self.records {
            *payload_formats
                .entry(record.payload.format.clone())
                .or_insert(0) += 1;
        }

        IndexStats {
            location: self.location.clone(),
            source: self.source,
            records: self.records.len(),
            fields: self.schema.len(),
            payload_formats,
            built_at: self.built_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::record::PayloadRef;
    use tempfile::tempdir;

    fn write_table(dir: &Path, text: &str) {
        std::fs::write(dir.join("meta_data.csv"), text).unwrap();
    }

    #[test]
    fn test_build_from_table() {
        let dir = tempdir().unwrap();
        write_table(
            dir.path(),
            "voltage,sample,pulsed,trial,filename\n\
             0.5,D0,true,0,p_0.csv\n\
             0.5,D1,false,1,p_1.csv\n\
             1.0,D0,,2,p_2.csv\n",
        );

        let (index, report) = MetadataIndex::build(dir.path()).unwrap();

        assert!(report.is_clean());
        assert_eq!(report.source, SourceKind::MetaTable);
        assert_eq!(index.size(), 3);
        assert_eq!(
            index.fields().into_iter().collect::<Vec<_>>(),
            vec!["filename", "pulsed", "sample", "trial", "voltage"]
        );
        assert_eq!(index.field_kind("voltage"), Some(FieldKind::Number));
        assert_eq!(index.field_kind("pulsed"), Some(FieldKind::Bool));
        assert_eq!(index.field_kind("sample"), Some(FieldKind::Text));

        let last = index.record(2).unwrap();
        assert_eq!(last.get("voltage"), &FieldValue::Number(1.0));
        assert_eq!(last.get("pulsed"), &FieldValue::Absent);
        assert_eq!(last.payload.path, dir.path().join("p_2.csv"));
        assert!(index.record(3).is_none());
    }

    #[test]
    fn test_malformed_rows_skipped_and_reported() {
        let dir = tempdir().unwrap();
        write_table(
            dir.path(),
            "voltage,filename\n0.5,a.csv\n0.7,\n1.0,a.csv\n1.5,b.csv\n",
        );

        let (index, report) = MetadataIndex::build(dir.path()).unwrap();

        assert_eq!(index.size(), 2);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.malformed.len(), 2);
        assert!(report
            .malformed
            .iter()
            .all(|e| matches!(e, IndexError::MetadataMalformed { .. })));
    }

    #[test]
    fn test_all_rows_malformed_is_empty_index() {
        let dir = tempdir().unwrap();
        write_table(dir.path(), "voltage,filename\n0.5,\n");

        let err = MetadataIndex::build(dir.path()).unwrap_err();
        let IndexError::EmptyIndex { malformed, .. } = err else {
            panic!("expected an empty index, got {err:?}");
        };
        assert_eq!(malformed.len(), 1);
        let reason = malformed[0].to_string();
        assert!(reason.contains("line 2"), "{reason}");
        assert!(reason.contains("filename"), "{reason}");
    }

    #[test]
    fn test_header_scan_fallback_fills_absent() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("a_0.csv"),
            "ekpy_heading\nvoltage:::0.5\nekpy_heading_complete\ntime,p1\n0,1\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_1.csv"),
            "ekpy_heading\nvoltage:::1.0\ndelay:::10\nekpy_heading_complete\ntime,p1\n0,1\n",
        )
        .unwrap();

        let (index, report) = MetadataIndex::build(dir.path()).unwrap();

        assert_eq!(report.source, SourceKind::HeaderScan);
        assert_eq!(index.size(), 2);
        assert_eq!(index.record(0).unwrap().get("delay"), &FieldValue::Absent);
        assert!(index.record(0).unwrap().has_field("delay"));
        assert_eq!(index.record(1).unwrap().get("delay"), &FieldValue::Number(10.0));
    }

    #[test]
    fn test_unreadable_location() {
        let dir = tempdir().unwrap();
        let err = MetadataIndex::build(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, IndexError::StorageUnreadable { .. }));
    }

    #[test]
    fn test_from_records() {
        let index = MetadataIndex::from_records(
            "mem",
            vec![
                MetadataRecord::new(PayloadRef::from_path("a.csv")).field("voltage", 0.5),
                MetadataRecord::new(PayloadRef::from_path("b.csv")).field("sample", "D0"),
            ],
        )
        .unwrap();

        assert_eq!(index.source(), SourceKind::InMemory);
        assert_eq!(index.record(0).unwrap().get("sample"), &FieldValue::Absent);
        assert!(index.record(1).unwrap().has_field("voltage"));
        assert_eq!(index.distinct_values("voltage", 0..index.size()).len(), 2);
    }

    #[test]
    fn test_from_records_rejects_mixed_kinds() {
        let err = MetadataIndex::from_records(
            "mem",
            vec![
                MetadataRecord::new(PayloadRef::from_path("a.csv")).field("voltage", 0.5),
                MetadataRecord::new(PayloadRef::from_path("b.csv")).field("voltage", "high"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::MixedFieldKinds { .. }));

        let err = MetadataIndex::from_records("mem", Vec::new()).unwrap_err();
        assert!(matches!(err, IndexError::EmptyIndex { .. }));
    }

    #[test]
    fn test_stats() {
        let index = MetadataIndex::from_records(
            "mem",
            vec![
                MetadataRecord::new(PayloadRef::from_path("a.csv")),
                MetadataRecord::new(PayloadRef::from_path("b.json")),
                MetadataRecord::new(PayloadRef::from_path("c.csv")),
            ],
        )
        .unwrap();

        let stats = index.stats();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.payload_formats.get("csv"), Some(&2));
        assert!(stats.to_string().contains("Records: 3"));
    }
}
