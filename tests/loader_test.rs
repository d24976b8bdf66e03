use std::path::Path;

use chrono::NaiveDate;
use tempfile::tempdir;

use forensic_ingest::loader::{load, AuditTarget};
use forensic_ingest::models::{NormalizedBatch, Value};
use forensic_ingest::{Database, IngestError, LogicalTable};

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn keylog(app: &str, body: &str) -> Vec<Value> {
    vec![text(app), text("Jan 05, 03:41 PM"), text("2026-01-05 15:41:00"), text(body)]
}

#[test]
fn test_two_identical_rows_and_one_distinct() {
    let db = Database::new("sqlite::memory:").unwrap();
    let conn = db.get_connection().unwrap();
    let batch = NormalizedBatch {
        table: LogicalTable::Keylogs,
        rows: vec![keylog("Notes", "a"), keylog("Notes", "a"), keylog("Notes", "b")],
        warnings: Vec::new(),
    };

    let outcome = load(&conn, batch, None).unwrap();
    assert_eq!(outcome.loaded, 2);
    assert_eq!(outcome.duplicates, 1);
    assert_eq!(outcome.audit_path, None);
    drop(conn);
    assert_eq!(db.count(LogicalTable::Keylogs).unwrap(), 2);
}

#[test]
fn test_duplicates_across_loads_are_kept() {
    let db = Database::new("sqlite::memory:").unwrap();
    let conn = db.get_connection().unwrap();
    for _ in 0..2 {
        let batch = NormalizedBatch {
            table: LogicalTable::Keylogs,
            rows: vec![keylog("Notes", "a")],
            warnings: Vec::new(),
        };
        assert_eq!(load(&conn, batch, None).unwrap().loaded, 1);
    }
    drop(conn);
    assert_eq!(db.count(LogicalTable::Keylogs).unwrap(), 2);
}

#[test]
fn test_locations_load_reports_existing() {
    let dir = tempdir().unwrap();
    let db = Database::new("sqlite::memory:").unwrap();
    let conn = db.get_connection().unwrap();
    conn.execute("INSERT INTO locations (location_text) VALUES ('Home')", [])
        .unwrap();

    let batch = NormalizedBatch {
        table: LogicalTable::Locations,
        rows: vec![vec![text("Home")], vec![text("Work")], vec![text("Work")]],
        warnings: Vec::new(),
    };
    let at = NaiveDate::from_ymd_opt(2026, 1, 5)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let audit = AuditTarget {
        directory: dir.path(),
        source: Path::new("places.xlsx"),
        at,
    };

    let outcome = load(&conn, batch, Some(audit)).unwrap();
    assert_eq!(outcome.loaded, 1);
    assert_eq!(outcome.duplicates, 1);
    assert_eq!(outcome.existing, 1);

    let audit_path = outcome.audit_path.unwrap();
    assert!(audit_path.ends_with("places_cleaned_20260105_080000.csv"));
    let contents = std::fs::read_to_string(audit_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "location_id,location_text");
    assert!(lines[1].ends_with(",Work"));
    assert_eq!(lines.len(), 2);
}

#[test]
fn test_foreign_key_violation_is_store_write_failure() {
    let db = Database::new("sqlite::memory:").unwrap();
    let conn = db.get_connection().unwrap();
    let batch = NormalizedBatch {
        table: LogicalTable::SmsMessages,
        rows: vec![vec![
            text("Alice"),
            text("hi"),
            text("Jan 05, 03:41 PM"),
            Value::Null,
            Value::Integer(999),
            Value::Null,
        ]],
        warnings: Vec::new(),
    };

    let err = load(&conn, batch, None).unwrap_err();
    assert!(matches!(
        err,
        IngestError::StoreWriteFailure {
            table: LogicalTable::SmsMessages,
            ..
        }
    ));
}
