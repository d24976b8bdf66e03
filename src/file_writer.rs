//! Audit artifact writing.
//!
//! Every successful load leaves a CSV copy of exactly the rows it wrote,
//! named `{stem}_cleaned_{YYYYMMDD_HHMMSS}.csv`. Existing audit files are
//! never overwritten; a clashing name gets a `_1`, `_2`, ... suffix.
//! Nothing reads these back.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use csv::Writer;

use crate::error::Result;
use crate::models::Value;

/// Timestamp layout used in audit file names
pub const AUDIT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Build the audit file name for an upload.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use forensic_ingest::file_writer::audit_file_name;
/// use std::path::Path;
///
/// let at = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(15, 41, 7).unwrap();
/// assert_eq!(audit_file_name(Path::new("/tmp/Calls Export.xlsx"), at), "Calls Export_cleaned_20260105_154107.csv");
/// ```
#[must_use]
pub fn audit_file_name(source: &Path, at: NaiveDateTime) -> String {
    let stem = source
        .file_stem()
        .map_or_else(|| "upload".into(), |s| s.to_string_lossy());
    format!("{stem}_cleaned_{}.csv", at.format(AUDIT_TIMESTAMP_FORMAT))
}

/// Write `rows` under `columns` to a new audit file in `audit_dir`.
///
/// # Returns
///
/// Path of the created file
pub fn write_audit_copy(
    audit_dir: &Path,
    source: &Path,
    at: NaiveDateTime,
    columns: &[&str],
    rows: &[Vec<Value>],
) -> Result<PathBuf> {
    create_dir_all(audit_dir)?;
    let (file_path, file) = create_unique(audit_dir, &audit_file_name(source, at))?;

    let mut writer = Writer::from_writer(file);
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }
    writer.flush()?;

    Ok(file_path)
}

/// Create `name` in `dir`, or the first free `{stem}_{n}.csv` variant.
fn create_unique(dir: &Path, name: &str) -> Result<(PathBuf, File)> {
    let stem = name.strip_suffix(".csv").unwrap_or(name);
    let mut attempt = 0u32;
    loop {
        let candidate = if attempt == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{stem}_{attempt}.csv"))
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_write_audit_copy_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let at = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let rows = vec![
            vec![Value::Text("Alice".into()), Value::Integer(45), Value::Null],
            vec![Value::Text("Bob, Jr".into()), Value::Integer(0), Value::Integer(3)],
        ];

        let path = write_audit_copy(
            &dir.path().join("audit"),
            Path::new("calls.csv"),
            at,
            &["from_to", "duration", "location_id"],
            &rows,
        )
        .unwrap();

        assert!(path.ends_with("calls_cleaned_20260105_090000.csv"));
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "Alice");
        assert_eq!(&records[0][2], "");
        assert_eq!(&records[1][0], "Bob, Jr");
    }

    #[test]
    fn test_write_audit_copy_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let at = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let write = |value: &str| {
            let rows = vec![vec![Value::Text(value.into())]];
            write_audit_copy(dir.path(), Path::new("x/apps.csv"), at, &["name"], &rows).unwrap()
        };

        let first = write("first");
        let second = write("second");
        let third = write("third");

        assert!(first.ends_with("apps_cleaned_20260105_090000.csv"));
        assert!(second.ends_with("apps_cleaned_20260105_090000_1.csv"));
        assert!(third.ends_with("apps_cleaned_20260105_090000_2.csv"));
        assert!(std::fs::read_to_string(&first).unwrap().contains("first"));
        assert!(std::fs::read_to_string(&second).unwrap().contains("second"));
    }
}
