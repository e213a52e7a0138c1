//! Metadata records
//!
//! One record describes one measurement: its instrument settings and where
//! its raw payload lives.

use crate::index::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

static ABSENT: FieldValue = FieldValue::Absent;

/// Reference to a payload on storage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayloadRef {
    /// Location of the payload file
    pub path: PathBuf,
    /// Format tag used to pick a loader (lower-cased file extension)
    pub format: String,
}

impl PayloadRef {
    /// Reference a file, deriving the format tag from its extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        Self { path, format }
    }

    /// Reference a payload with an explicit format tag
    pub fn new(path: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for PayloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Metadata of one measurement
///
/// Inside a [`MetadataIndex`](crate::index::MetadataIndex) every record
/// carries every field of the index; missing ones are [`FieldValue::Absent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Field name → value
    pub fields: BTreeMap<String, FieldValue>,
    /// Where the raw payload lives
    pub payload: PayloadRef,
}

impl MetadataRecord {
    /// Create a record with no fields
    pub fn new(payload: PayloadRef) -> Self {
        Self {
            fields: BTreeMap::new(),
            payload,
        }
    }

    /// Builder method: set a field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Value of a field; unknown fields read as absent
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&ABSENT)
    }

    /// Whether the record has a field (absent values included)
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Short identifier for logs and errors
    pub fn label(&self) -> String {
        self.payload.to_string()
    }
}
