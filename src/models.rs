//! Data models for dump ingestion
//!
//! Parsed uploads ([`RawRecordBatch`]), their canonical form
//! ([`NormalizedBatch`]) and the outcome reported back to the caller.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};

use crate::schema::LogicalTable;

/// Storage format of parsed timestamps
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadFormat {
    /// Comma-separated values
    Csv,
    /// Office Open XML workbook
    Xlsx,
}

impl UploadFormat {
    /// Detect the format from a path's extension, ignoring case.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

/// Rows parsed from one upload, keyed by normalized header names.
#[derive(Debug, Clone, Default)]
pub struct RawRecordBatch {
    /// Upload the rows came from
    pub source: PathBuf,
    /// Normalized header names in file order
    pub columns: Vec<String>,
    /// Cell values; every row has `columns.len()` cells
    pub rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl RawRecordBatch {
    /// Build a batch, padding or truncating rows to the header width.
    ///
    /// When a header repeats, the first occurrence is the one looked up by name.
    #[must_use]
    pub fn new(source: PathBuf, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            index.entry(column.clone()).or_insert(i);
        }
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            source,
            columns,
            rows,
            index,
        }
    }

    /// Position of a column, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// True if the batch carries the named column.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of data rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the file had a header but no data rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A canonical cell value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL, also the "unparsed" sentinel for timestamps
    Null,
    /// Integer value
    Integer(i64),
    /// Text value
    Text(String),
}

impl Value {
    /// Text value, or `None` for non-text cells.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for NULL
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Parsed timestamp cell
    #[must_use]
    pub fn from_datetime(dt: Option<NaiveDateTime>) -> Self {
        dt.map_or(Self::Null, |dt| Self::Text(dt.format(DATETIME_FORMAT).to_string()))
    }
}

impl From<Option<i64>> for Value {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Null => Ok(ToSqlOutput::from(rusqlite::types::Null)),
            Self::Integer(i) => Ok(ToSqlOutput::from(*i)),
            Self::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

/// A single row's field that failed to parse and was replaced by a sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowParseWarning {
    /// Zero-based data row index within the upload
    pub row: usize,
    /// Column that failed
    pub column: String,
    /// Offending raw value
    pub value: String,
    /// What the normalizer expected
    pub reason: String,
}

/// Canonical rows ready for loading, laid out as [`LogicalTable::persisted_columns`].
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    /// Target table
    pub table: LogicalTable,
    /// Canonical rows
    pub rows: Vec<Vec<Value>>,
    /// Row-level parse problems absorbed during normalization
    pub warnings: Vec<RowParseWarning>,
}

/// Data for creating a new contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    /// Contact's display name (dedup key)
    pub name: String,
    /// Contact's phone number
    pub phone_number: Option<String>,
    /// Contact's email address
    pub email: Option<String>,
    /// Raw "last contacted" value
    pub last_contacted: Option<String>,
    /// Parsed "last contacted" timestamp
    pub last_contacted_dt: Option<NaiveDateTime>,
}

/// Outcome of a get-or-create lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Surrogate key of the existing or new row
    pub id: i64,
    /// True if this call inserted the row
    pub created: bool,
}

/// Result of ingesting one upload.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Upload that was ingested
    pub source: PathBuf,
    /// Table the upload was classified as
    pub table: LogicalTable,
    /// Rows written to the store
    pub loaded: usize,
    /// Rows dropped as exact duplicates within the upload
    pub duplicates: usize,
    /// Reference rows (contacts, locations) that already existed and were left untouched
    pub existing: usize,
    /// Row-level parse problems absorbed during normalization
    pub warnings: Vec<RowParseWarning>,
    /// Audit copy of the rows written
    pub audit_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_format_detection_ignores_case() {
        assert_eq!(UploadFormat::from_path(Path::new("a/Calls.CSV")), Some(UploadFormat::Csv));
        assert_eq!(UploadFormat::from_path(Path::new("dump.xlsx")), Some(UploadFormat::Xlsx));
        assert_eq!(UploadFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!(UploadFormat::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn test_raw_batch_pads_short_rows() {
        let batch = RawRecordBatch::new(
            PathBuf::from("x.csv"),
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec!["1".into()], vec!["1".into(), "2".into(), "3".into(), "4".into()]],
        );
        assert_eq!(batch.rows[0], vec!["1", "", ""]);
        assert_eq!(batch.rows[1].len(), 3);
        assert_eq!(batch.column_index("c"), Some(2));
    }

    #[test]
    fn test_raw_batch_first_duplicate_header_wins() {
        let batch = RawRecordBatch::new(PathBuf::new(), vec!["a".into(), "a".into()], vec![]);
        assert_eq!(batch.column_index("a"), Some(0));
    }
}
