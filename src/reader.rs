//! Tabular file readers for the two supported upload formats.
//!
//! Both readers produce a [`RawRecordBatch`] whose header names have been run
//! through [`normalize_column_name`].

use std::path::Path;
use std::sync::OnceLock;

use calamine::{open_workbook_auto, Data, Reader};
use regex::Regex;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::models::{RawRecordBatch, UploadFormat};

fn whitespace_re() -> &'static Regex {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Lower-case a header and replace whitespace runs with underscores.
///
/// `" Phone  Number "` becomes `"phone_number"`.
#[must_use]
pub fn normalize_column_name(name: &str) -> String {
    whitespace_re()
        .replace_all(name.trim(), "_")
        .to_lowercase()
}

/// Parse an upload into rows keyed by normalized header names.
pub fn read_batch(path: &Path, format: UploadFormat) -> Result<RawRecordBatch> {
    let batch = match format {
        UploadFormat::Csv => read_csv(path)?,
        UploadFormat::Xlsx => read_xlsx(path)?,
    };
    debug!(
        path = %path.display(),
        columns = batch.columns.len(),
        rows = batch.len(),
        "Parsed upload"
    );
    Ok(batch)
}

fn read_csv(path: &Path) -> Result<RawRecordBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(normalize_column_name).collect();
    if columns.iter().all(String::is_empty) {
        return Err(IngestError::FileRead {
            path: path.to_path_buf(),
            reason: "missing header row".to_string(),
        });
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(ToString::to_string).collect());
    }

    Ok(RawRecordBatch::new(path.to_path_buf(), columns, rows))
}

fn read_xlsx(path: &Path) -> Result<RawRecordBatch> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::FileRead {
            path: path.to_path_buf(),
            reason: "workbook has no worksheets".to_string(),
        })?;
    let range = workbook.worksheet_range(&sheet)?;

    let mut rows = range.rows();
    let columns: Vec<String> = rows
        .next()
        .ok_or_else(|| IngestError::FileRead {
            path: path.to_path_buf(),
            reason: format!("worksheet `{sheet}` is empty"),
        })?
        .iter()
        .map(|cell| normalize_column_name(&cell_to_string(cell)))
        .collect();

    let rows: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    Ok(RawRecordBatch::new(path.to_path_buf(), columns, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        other => other.to_string(),
    }
}
