//! Canonical group keys

use crate::index::FieldValue;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// `(field, value)` pairs sorted by field name.
///
/// Two records with the same values for the grouping fields always produce
/// equal keys, whatever order the fields were requested in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GroupKey(Vec<(String, FieldValue)>);

impl GroupKey {
    /// Build a key, sorting the pairs by field name
    pub fn new(pairs: impl IntoIterator<Item = (String, FieldValue)>) -> Self {
        let mut pairs: Vec<(String, FieldValue)> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.dedup_by(|a, b| a.0 == b.0);
        Self(pairs)
    }

    /// Value of one grouping field
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0
            .binary_search_by(|(name, _)| name.as_str().cmp(field))
            .ok()
            .map(|i| &self.0[i].1)
    }

    pub fn pairs(&self) -> &[(String, FieldValue)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(all)");
        }
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
