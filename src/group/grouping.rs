//! Grouping of index rows
//!
//! One pass over the input rows. The first time a key is seen it gets the
//! next group index (starting at 0); later rows with that key are appended
//! to its member list.
//!
//! ```text
//! rows:    0      1      2      3
//! voltage: 0.5    0.5    1.0    1.0
//!          │      │      │      │
//! group:   0 ◀────┘      1 ◀────┘
//! ```

use crate::group::error::{GroupError, GroupResult};
use crate::group::key::GroupKey;
use crate::index::MetadataIndex;
use serde::Serialize;
use std::collections::HashMap;

/// One group of a grouping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Group index, dense from 0 in first-seen order
    pub index: usize,
    pub key: GroupKey,
    /// Member record positions, in input order
    pub rows: Vec<usize>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partition of a set of index rows by grouping fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedIndex {
    fields: Vec<String>,
    groups: Vec<Group>,
}

impl GroupedIndex {
    /// Group `rows` of `index` by the distinct values of `fields`.
    ///
    /// Duplicate fields are ignored. Every field must exist in the index.
    pub fn build<S: AsRef<str>>(
        index: &MetadataIndex,
        rows: &[usize],
        fields: &[S],
    ) -> GroupResult<Self> {
        let mut names: Vec<String> = Vec::with_capacity(fields.len());
        for field in fields {
            let field = field.as_ref();
            if !index.has_field(field) {
                return Err(GroupError::UnknownGroupingField {
                    field: field.to_string(),
                });
            }
            if !names.iter().any(|n| n == field) {
                names.push(field.to_string());
            }
        }
        names.sort();

        let mut groups: Vec<Group> = Vec::new();
        let mut lookup: HashMap<GroupKey, usize> = HashMap::new();

        for &row in rows {
            let Some(record) = index.record(row) else {
                continue;
            };
            let key = GroupKey::new(
                names
                    .iter()
                    .map(|name| (name.clone(), record.get(name).clone())),
            );

            match lookup.get(&key) {
                Some(&g) => groups[g].rows.push(row),
                None => {
                    let g = groups.len();
                    lookup.insert(key.clone(), g);
                    groups.push(Group {
                        index: g,
                        key,
                        rows: vec![row],
                    });
                }
            }
        }

        tracing::debug!(
            fields = ?names,
            rows = rows.len(),
            groups = groups.len(),
            "Grouped rows"
        );

        Ok(Self {
            fields: names,
            groups,
        })
    }

    /// Grouping fields, sorted
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Group by index
    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of grouped rows
    pub fn member_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// Validate a selection of group indices; sorted, duplicates removed
    pub fn select(&self, indices: &[usize]) -> GroupResult<Vec<usize>> {
        let mut selected = Vec::with_capacity(indices.len());
        for &index in indices {
            if index >= self.groups.len() {
                return Err(GroupError::UnknownGroup {
                    index,
                    groups: self.groups.len(),
                });
            }
            selected.push(index);
        }
        selected.sort_unstable();
        selected.dedup();
        Ok(selected)
    }

    /// Every group index
    pub fn all(&self) -> Vec<usize> {
        (0..self.groups.len()).collect()
    }
}
