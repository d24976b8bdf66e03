//! Table classification by column set.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{IngestError, Result};
use crate::reader::normalize_column_name;
use crate::schema::LogicalTable;

/// Pick the table whose signature is contained in `columns`.
///
/// Column names are normalized before matching. Tables are tried in
/// [`LogicalTable::ALL`] order and the first full match wins, so a file that
/// satisfies several signatures is classified as the earliest declared one.
pub fn classify<I, S>(columns: I) -> Result<LogicalTable>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let columns: HashSet<String> = columns
        .into_iter()
        .map(|c| normalize_column_name(c.as_ref()))
        .collect();

    let matched = LogicalTable::ALL
        .into_iter()
        .find(|table| table.signature().iter().all(|c| columns.contains(*c)));

    if let Some(table) = matched {
        debug!(%table, "Classified upload");
        return Ok(table);
    }

    let mut columns: Vec<String> = columns.into_iter().collect();
    columns.sort();
    Err(IngestError::UnrecognizedSchema { columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_signature() {
        for table in LogicalTable::ALL {
            let earliest = LogicalTable::ALL
                .into_iter()
                .find(|t| t.signature().iter().all(|c| table.signature().contains(c)))
                .unwrap();
            assert_eq!(classify(table.signature()).unwrap(), earliest);
        }
    }

    #[test]
    fn test_classify_normalizes_headers() {
        let table = classify(["Application Name", " PACKAGE NAME", "Version"]).unwrap();
        assert_eq!(table, LogicalTable::Installedapps);
    }

    #[test]
    fn test_first_declared_wins() {
        // A calls dump that also carries a `text` column satisfies sms_messages first.
        let table = classify(["from_to", "call_type", "time", "text", "duration"]).unwrap();
        assert_eq!(table, LogicalTable::SmsMessages);
    }

    #[test]
    fn test_unrecognized_lists_columns() {
        let err = classify(["foo", "Bar"]).unwrap_err();
        match err {
            IngestError::UnrecognizedSchema { columns } => assert_eq!(columns, vec!["bar", "foo"]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
