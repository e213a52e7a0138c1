//! Metadata field values
//!
//! Metadata columns are loosely typed on disk. Every cell is held as a closed
//! set of scalar kinds so comparisons can be checked against a column's kind
//! before any record is scanned.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single metadata cell
///
/// `Ord`, `Eq` and `Hash` are total (floats compare with `total_cmp`) so
/// values can key `BTreeMap`s during grouping. Query evaluation uses
/// [`FieldValue::compare`] instead, which never orders across kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Bool(bool),
    Text(String),
    /// The record has no value for this field
    Absent,
}

impl FieldValue {
    /// Create a numeric value, folding `-0.0` into `0.0`
    pub fn number(value: f64) -> Self {
        if value == 0.0 {
            FieldValue::Number(0.0)
        } else {
            FieldValue::Number(value)
        }
    }

    /// Create a text value
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Kind of this value
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Absent => FieldKind::Empty,
        }
    }

    /// Whether this is the absent marker
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Numeric value, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Same-kind comparison used by queries.
    ///
    /// Numbers use IEEE ordering (NaN is unordered), text is lexicographic,
    /// `false < true`. Returns `None` across kinds or when either side is absent.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Absent => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Number(_) => 2,
            FieldValue::Text(_) => 3,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl std::hash::Hash for FieldValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            FieldValue::Number(v) => v.to_bits().hash(state),
            FieldValue::Text(s) => s.hash(state),
            FieldValue::Bool(b) => b.hash(state),
            FieldValue::Absent => {}
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Absent => write!(f, "<absent>"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::number(v as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// Kind of a metadata column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Number,
    Bool,
    Text,
    /// Absent in every record
    Empty,
}

impl FieldKind {
    /// Infer the kind of a column from its raw text cells.
    ///
    /// Empty cells are ignored. A column is numeric if every other cell is a
    /// decimal number (`nan` and `inf` spellings stay text), boolean if every other cell is `true`/`false` in any case,
    /// and text otherwise.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> FieldKind {
        let mut seen = false;
        let mut numeric = true;
        let mut boolean = true;

        for cell in cells {
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            seen = true;
            numeric &= parse_number(cell).is_some();
            boolean &= parse_bool(cell).is_some();
            if !numeric && !boolean {
                return FieldKind::Text;
            }
        }

        match (seen, numeric, boolean) {
            (false, _, _) => FieldKind::Empty,
            (true, true, _) => FieldKind::Number,
            (true, false, true) => FieldKind::Bool,
            _ => FieldKind::Text,
        }
    }

    /// Convert a raw cell into a value of this kind
    pub fn parse(&self, cell: &str) -> FieldValue {
        let cell = cell.trim();
        if cell.is_empty() {
            return FieldValue::Absent;
        }
        match self {
            FieldKind::Number => parse_number(cell)
                .map(FieldValue::number)
                .unwrap_or(FieldValue::Absent),
            FieldKind::Bool => parse_bool(cell)
                .map(FieldValue::Bool)
                .unwrap_or(FieldValue::Absent),
            FieldKind::Text => FieldValue::Text(cell.to_string()),
            FieldKind::Empty => FieldValue::Absent,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Number => write!(f, "number"),
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::Text => write!(f, "text"),
            FieldKind::Empty => write!(f, "empty"),
        }
    }
}

/// A number must contain at least one digit
fn parse_number(cell: &str) -> Option<f64> {
    if !cell.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    cell.parse::<f64>().ok()
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_infer_kinds() {
        assert_eq!(FieldKind::infer(["0.5", "1e-6", " 2 "]), FieldKind::Number);
        assert_eq!(FieldKind::infer(["True", "false", ""]), FieldKind::Bool);
        assert_eq!(FieldKind::infer(["D0", "1.0"]), FieldKind::Text);
        assert_eq!(FieldKind::infer(["", "  "]), FieldKind::Empty);
        assert_eq!(FieldKind::infer(Vec::<&str>::new()), FieldKind::Empty);
    }

    #[test]
    fn test_nan_and_inf_are_text() {
        assert_eq!(FieldKind::infer(["nan", "inf"]), FieldKind::Text);
        assert_eq!(FieldKind::infer(["0.5", "NaN"]), FieldKind::Text);
        assert_eq!(FieldKind::infer(["infinity", "-inf"]), FieldKind::Text);
        assert_eq!(FieldKind::Number.parse("nan"), FieldValue::Absent);
        assert_eq!(FieldKind::Number.parse("-1.5E3"), FieldValue::Number(-1500.0));
    }

    #[test]
    fn test_parse_cells() {
        assert_eq!(FieldKind::Number.parse("0.5"), FieldValue::Number(0.5));
        assert_eq!(FieldKind::Number.parse(""), FieldValue::Absent);
        assert_eq!(FieldKind::Bool.parse("TRUE"), FieldValue::Bool(true));
        assert_eq!(FieldKind::Text.parse(" D0 "), FieldValue::text("D0"));
    }

    #[test]
    fn test_compare_same_kind_only() {
        let a = FieldValue::number(0.5);
        let b = FieldValue::number(1.0);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(
            FieldValue::text("abc").compare(&FieldValue::text("abd")),
            Some(Ordering::Less)
        );
        assert_eq!(a.compare(&FieldValue::text("0.5")), None);
        assert_eq!(a.compare(&FieldValue::Absent), None);
        assert_eq!(
            FieldValue::number(f64::NAN).compare(&FieldValue::number(f64::NAN)),
            None
        );
    }

    #[test]
    fn test_total_order_for_keys() {
        let mut set = BTreeSet::new();
        set.insert(FieldValue::number(-0.0));
        set.insert(FieldValue::number(0.0));
        set.insert(FieldValue::number(f64::NAN));
        set.insert(FieldValue::number(f64::NAN));
        set.insert(FieldValue::Absent);
        set.insert(FieldValue::text("x"));
        assert_eq!(set.len(), 4);
        assert_eq!(set.iter().next(), Some(&FieldValue::Absent));
    }
}
