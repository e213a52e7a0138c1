//! ekpy data file format
//!
//! Measurements are saved as a CSV table preceded by an optional metadata
//! heading:
//!
//! ```text
//! ekpy_heading
//! voltage:::0.5
//! sample:::D0
//! ekpy_heading_complete
//! time,p1,p2
//! 0.0,0.12,0.30
//! 1e-6,0.14,
//! ```
//!
//! A file whose first line is not `ekpy_heading` is read as a plain CSV
//! table. Table cells that are empty or not numeric read back as NaN, which
//! is also how NaN is written.

use crate::storage::error::{StorageError, StorageResult};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// First line of an ekpy heading
pub const HEADING_START: &str = "ekpy_heading";

/// Line closing an ekpy heading
pub const HEADING_END: &str = "ekpy_heading_complete";

/// Separator between key and value on a heading line
pub const HEADING_SEPARATOR: &str = ":::";

/// Ordered `key:::value` entries of a heading
pub type Heading = Vec<(String, String)>;

/// A fully parsed ekpy data file
#[derive(Debug, Clone, PartialEq)]
pub struct EkpyData {
    /// Heading entries, `None` for a plain CSV table
    pub heading: Option<Heading>,
    /// Column names in file order
    pub columns: Vec<String>,
    /// Column-major cell values, one vector per column
    pub values: Vec<Vec<f64>>,
}

impl EkpyData {
    /// Number of table rows
    pub fn rows(&self) -> usize {
        self.values.first().map(Vec::len).unwrap_or(0)
    }

    /// Values of a column by name
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Consume into `(name, values)` pairs in file order
    pub fn into_columns(self) -> Vec<(String, Vec<f64>)> {
        self.columns.into_iter().zip(self.values).collect()
    }
}

/// Read only the heading of a file, stopping at its closing line.
///
/// Returns `Ok(None)` when the file does not start with an ekpy heading.
pub fn read_heading(path: &Path) -> StorageResult<Option<Heading>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    match lines.next() {
        Some(first) => {
            if !is_heading_start(&first?) {
                return Ok(None);
            }
        }
        None => return Ok(None),
    }

    let mut heading = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if parse_heading_line(path, idx + 2, &line, &mut heading)? {
            return Ok(Some(heading));
        }
    }

    Err(StorageError::UnterminatedHeading {
        path: path.to_path_buf(),
    })
}

/// Read and parse a whole ekpy data file
pub fn read_ekpy_data(path: &Path) -> StorageResult<EkpyData> {
    let text = std::fs::read_to_string(path)?;
    parse_ekpy_data(path, &text)
}

/// Parse ekpy file contents. `path` is only used in error messages.
pub fn parse_ekpy_data(path: &Path, text: &str) -> StorageResult<EkpyData> {
    let (heading, body) = split_heading(path, text)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];

    for record in reader.records() {
        let record = record?;
        for (column, cell) in values.iter_mut().zip(record.iter()) {
            column.push(parse_cell(cell));
        }
    }

    Ok(EkpyData {
        heading,
        columns,
        values,
    })
}

/// Write a table with a metadata heading.
///
/// `columns` are `(name, values)` pairs that must all have the same length.
pub fn write_ekpy_data<K, V>(
    path: &Path,
    heading: &[(K, V)],
    columns: &[(&str, &[f64])],
) -> StorageResult<()>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
    for (name, values) in columns {
        if values.len() != rows {
            return Err(StorageError::RaggedColumns {
                column: name.to_string(),
                expected: rows,
                found: values.len(),
            });
        }
    }

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", HEADING_START)?;
    for (key, value) in heading {
        writeln!(
            out,
            "{}{}{}",
            single_line(key.as_ref()),
            HEADING_SEPARATOR,
            single_line(value.as_ref())
        )?;
    }
    writeln!(out, "{}", HEADING_END)?;

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record(columns.iter().map(|(name, _)| *name))?;
    for row in 0..rows {
        writer.write_record(columns.iter().map(|(_, values)| format_cell(values[row])))?;
    }
    writer.flush()?;

    Ok(())
}

/// Split file contents into heading and table body
fn split_heading<'a>(path: &Path, text: &'a str) -> StorageResult<(Option<Heading>, &'a str)> {
    let mut lines = text.split_inclusive('\n');

    let first = match lines.next() {
        Some(line) => line,
        None => return Ok((None, text)),
    };
    if !is_heading_start(first) {
        return Ok((None, text));
    }

    let mut offset = first.len();
    let mut heading = Vec::new();
    for (idx, line) in lines.enumerate() {
        offset += line.len();
        if parse_heading_line(path, idx + 2, line, &mut heading)? {
            return Ok((Some(heading), &text[offset..]));
        }
    }

    Err(StorageError::UnterminatedHeading {
        path: path.to_path_buf(),
    })
}

fn is_heading_start(line: &str) -> bool {
    line.trim_start_matches('\u{feff}').trim() == HEADING_START
}

/// Parse one line inside a heading. Returns `true` on the closing line.
fn parse_heading_line(
    path: &Path,
    line_no: usize,
    line: &str,
    heading: &mut Heading,
) -> StorageResult<bool> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim() == HEADING_END {
        return Ok(true);
    }
    if trimmed.trim().is_empty() {
        return Ok(false);
    }

    match trimmed.split_once(HEADING_SEPARATOR) {
        Some((key, value)) => {
            heading.push((key.trim().to_string(), value.trim().to_string()));
            Ok(false)
        }
        None => Err(StorageError::MalformedHeading {
            path: path.to_path_buf(),
            line: line_no,
            text: trimmed.to_string(),
        }),
    }
}

/// Parse a table cell, mapping empty or non-numeric cells to NaN
pub fn parse_cell(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.is_empty() {
        return f64::NAN;
    }
    cell.parse::<f64>().unwrap_or(f64::NAN)
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}
