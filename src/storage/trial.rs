//! Trial writer
//!
//! Saves one measurement ("trial") into a storage directory the way the
//! acquisition side does: the payload goes to a fresh `<base>_<n>.csv` ekpy
//! file and the metadata row, extended with `trial` and `filename`, is
//! appended to the directory's `meta_data.csv`.
//!
//! All rows of one metadata table must share a column set; a row with
//! different columns is refused after its payload file has been written, so
//! the data is never lost.

use crate::storage::ekpy::write_ekpy_data;
use crate::storage::error::{StorageError, StorageResult};
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Default name of the metadata table inside a storage directory
pub const META_DATA_FILE: &str = "meta_data.csv";

/// Field holding the per-base trial counter
pub const TRIAL_FIELD: &str = "trial";

/// Field holding the payload file name
pub const FILENAME_FIELD: &str = "filename";

/// Outcome of a saved trial
#[derive(Debug, Clone, PartialEq)]
pub struct SavedTrial {
    /// Trial counter assigned to this base name
    pub trial: u32,
    /// File name of the payload, relative to the directory
    pub filename: String,
    /// Full path of the payload file
    pub path: PathBuf,
}

/// Writes trials into one storage directory
#[derive(Debug, Clone)]
pub struct TrialWriter {
    dir: PathBuf,
    meta_data_file: String,
}

impl TrialWriter {
    /// Create a writer for a directory (which must already exist)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            meta_data_file: META_DATA_FILE.to_string(),
        }
    }

    /// Use a different metadata table file name
    pub fn with_meta_data_file(mut self, name: impl Into<String>) -> Self {
        self.meta_data_file = name.into();
        self
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the metadata table
    pub fn meta_data_path(&self) -> PathBuf {
        self.dir.join(&self.meta_data_file)
    }

    /// Smallest unused trial counter for a base name
    pub fn next_trial(&self, base: &str) -> StorageResult<u32> {
        validate_base(base)?;

        let prefix = format!("{}_", base);
        let mut used = BTreeSet::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(n) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".csv"))
                .and_then(|n| n.parse::<u32>().ok())
            {
                used.insert(n);
            }
        }

        Ok((0..).find(|n| !used.contains(n)).unwrap_or(0))
    }

    /// Save a trial's payload and append its metadata row
    pub fn save<K, V>(
        &self,
        base: &str,
        metadata: &[(K, V)],
        columns: &[(&str, &[f64])],
    ) -> StorageResult<SavedTrial>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let trial = self.next_trial(base)?;
        let filename = format!("{}_{}.csv", base, trial);
        let path = self.dir.join(&filename);

        let mut row: Vec<(String, String)> = metadata
            .iter()
            .filter(|(k, _)| k.as_ref() != TRIAL_FIELD && k.as_ref() != FILENAME_FIELD)
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        row.push((TRIAL_FIELD.to_string(), trial.to_string()));
        row.push((FILENAME_FIELD.to_string(), filename.clone()));

        write_ekpy_data(&path, &row, columns)?;
        tracing::debug!("Saved trial {} to {:?}", trial, path);

        self.append_meta_data(&row)?;

        Ok(SavedTrial {
            trial,
            filename,
            path,
        })
    }

    /// Append one row to the metadata table, creating it if needed
    fn append_meta_data(&self, row: &[(String, String)]) -> StorageResult<()> {
        let path = self.meta_data_path();

        if !path.exists() {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_path(&path)?;
            writer.write_record(row.iter().map(|(k, _)| k.as_str()))?;
            writer.write_record(row.iter().map(|(_, v)| v.as_str()))?;
            writer.flush()?;
            return Ok(());
        }

        let existing: Vec<String> = csv::Reader::from_path(&path)?
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let expected: BTreeSet<&str> = existing.iter().map(String::as_str).collect();
        let found: BTreeSet<&str> = row.iter().map(|(k, _)| k.as_str()).collect();
        if expected != found || existing.len() != row.len() {
            return Err(StorageError::SchemaMismatch {
                path,
                expected: existing,
                found: row.iter().map(|(k, _)| k.clone()).collect(),
            });
        }

        // Reorder to the table's column order
        let ordered: Vec<&str> = existing
            .iter()
            .map(|col| {
                row.iter()
                    .find(|(k, _)| k == col)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("")
            })
            .collect();

        let file = OpenOptions::new().append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        writer.write_record(&ordered)?;
        writer.flush()?;

        Ok(())
    }
}

fn validate_base(base: &str) -> StorageResult<()> {
    if base.is_empty() || base.contains(['/', '\\']) || base == "." || base == ".." {
        return Err(StorageError::InvalidBaseName(base.to_string()));
    }
    Ok(())
}
