//! Deduplicating loader.
//!
//! Drops rows that exactly repeat an earlier row of the same batch, appends
//! the rest to the target table, and writes the audit copy. Duplicates
//! against rows persisted by earlier uploads are not checked.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::file_writer::write_audit_copy;
use crate::models::{NewContact, NormalizedBatch, Value, DATETIME_FORMAT};
use crate::resolver::ReferenceResolver;
use crate::schema::{contacts, locations, LogicalTable};

/// Counts produced by one load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Rows written to the store
    pub loaded: usize,
    /// Rows dropped as in-batch duplicates
    pub duplicates: usize,
    /// Reference rows that already existed
    pub existing: usize,
    /// Audit copy of the rows written
    pub audit_path: Option<PathBuf>,
}

/// Where and when to write the audit copy
#[derive(Debug, Clone, Copy)]
pub struct AuditTarget<'a> {
    /// Directory receiving audit files
    pub directory: &'a Path,
    /// Upload the rows came from
    pub source: &'a Path,
    /// Load time, used in the file name
    pub at: NaiveDateTime,
}

/// Remove rows equal in every column to an earlier row, keeping first occurrences.
///
/// Returns the surviving rows and the number dropped.
#[must_use]
pub fn dedup_rows(rows: Vec<Vec<Value>>) -> (Vec<Vec<Value>>, usize) {
    let total = rows.len();
    let mut seen = HashSet::with_capacity(total);
    let kept: Vec<Vec<Value>> = rows.into_iter().filter(|row| seen.insert(row.clone())).collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

/// Deduplicate `batch`, append it through `conn`, and write the audit copy.
///
/// `conn` is normally the per-file transaction. Contacts and locations go
/// through get-or-create so their uniqueness holds; fact tables are appended.
pub fn load(conn: &Connection, batch: NormalizedBatch, audit: Option<AuditTarget<'_>>) -> Result<LoadOutcome> {
    let table = batch.table;
    let (rows, duplicates) = dedup_rows(batch.rows);

    let (written, columns, existing) = if table.is_reference() {
        let (written, existing) = load_reference(conn, table, rows)?;
        let columns = match table {
            LogicalTable::Contacts => {
                let mut c = vec![contacts::ID];
                c.extend_from_slice(table.persisted_columns());
                c
            }
            _ => vec![locations::ID, locations::TEXT],
        };
        (written, columns, existing)
    } else {
        append(conn, table, &rows)?;
        (rows, table.persisted_columns().to_vec(), 0)
    };

    let audit_path = match audit {
        Some(target) => Some(write_audit_copy(
            target.directory,
            target.source,
            target.at,
            &columns,
            &written,
        )?),
        None => None,
    };

    info!(
        %table,
        loaded = written.len(),
        duplicates,
        existing,
        "Batch loaded"
    );

    Ok(LoadOutcome {
        loaded: written.len(),
        duplicates,
        existing,
        audit_path,
    })
}

fn append(conn: &Connection, table: LogicalTable, rows: &[Vec<Value>]) -> Result<()> {
    let columns = table.persisted_columns();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name(),
        columns.join(", "),
        placeholders
    );

    let write_failure = |source: rusqlite::Error| IngestError::StoreWriteFailure { table, source };
    let mut stmt = conn.prepare(&sql).map_err(write_failure)?;
    for row in rows {
        stmt.execute(params_from_iter(row.iter())).map_err(write_failure)?;
    }
    debug!(%table, rows = rows.len(), "Appended rows");
    Ok(())
}

/// Get-or-create every row; returns the rows actually created (id first) and
/// the number that already existed.
fn load_reference(
    conn: &Connection,
    table: LogicalTable,
    rows: Vec<Vec<Value>>,
) -> Result<(Vec<Vec<Value>>, usize)> {
    let resolver = ReferenceResolver::new(conn);
    let mut written = Vec::new();
    let mut existing = 0;

    for row in rows {
        let resolved = match table {
            LogicalTable::Contacts => Some(
                resolver
                    .get_or_create_contact(&contact_from_row(&row))
                    .map_err(|e| into_write_failure(table, e))?,
            ),
            _ => {
                let text = row.first().and_then(Value::as_text).unwrap_or_default();
                resolver
                    .get_or_create_location(text)
                    .map_err(|e| into_write_failure(table, e))?
            }
        };

        match resolved {
            Some(r) if r.created => {
                let mut out = Vec::with_capacity(row.len() + 1);
                out.push(Value::Integer(r.id));
                out.extend(row);
                written.push(out);
            }
            Some(_) => existing += 1,
            None => {}
        }
    }

    Ok((written, existing))
}

fn into_write_failure(table: LogicalTable, err: IngestError) -> IngestError {
    match err {
        IngestError::Database(source) => IngestError::StoreWriteFailure { table, source },
        other => other,
    }
}

fn contact_from_row(row: &[Value]) -> NewContact {
    let text = |i: usize| row.get(i).and_then(Value::as_text).map(ToString::to_string);
    NewContact {
        name: text(0).unwrap_or_default(),
        phone_number: text(1),
        email: text(2),
        last_contacted: text(3),
        last_contacted_dt: text(4)
            .and_then(|dt| NaiveDateTime::parse_from_str(&dt, DATETIME_FORMAT).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_dedup_rows_keeps_first_occurrence() {
        let rows = vec![
            vec![text("a"), Value::Integer(1)],
            vec![text("b"), Value::Integer(1)],
            vec![text("a"), Value::Integer(1)],
        ];
        let (kept, dropped) = dedup_rows(rows);
        assert_eq!(dropped, 1);
        assert_eq!(kept, vec![vec![text("a"), Value::Integer(1)], vec![text("b"), Value::Integer(1)]]);
    }

    #[test]
    fn test_dedup_treats_null_and_empty_text_as_different() {
        let (kept, dropped) = dedup_rows(vec![vec![Value::Null], vec![text("")]]);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_contact_from_row() {
        let row = vec![
            text("Bob"),
            Value::Null,
            text("bob@example.com"),
            text("Jan 05, 03:41 PM"),
            text("2026-01-05 15:41:00"),
        ];
        let contact = contact_from_row(&row);
        assert_eq!(contact.name, "Bob");
        assert_eq!(contact.phone_number, None);
        assert_eq!(contact.email.as_deref(), Some("bob@example.com"));
        assert_eq!(contact.last_contacted_dt.unwrap().to_string(), "2026-01-05 15:41:00");
    }
}
