use rusqlite::types::ValueRef;
use rusqlite::{params, Params, Row};
use serde_json::{Map, Number, Value as JsonValue};
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::schema::{chat_messages, sms_messages, LogicalTable};
use crate::validation::InputValidator;

/// One stored row, keyed by column name
pub type Record = Map<String, JsonValue>;

/// Read access to ingested records
#[derive(Clone)]
pub struct RecordRepository {
    database: Database,
    search_limit: usize,
}

impl RecordRepository {
    /// `search_limit` caps the rows returned by [`search`](Self::search)
    #[must_use]
    pub const fn new(database: Database, search_limit: usize) -> Self {
        Self { database, search_limit }
    }

    /// Every row of `table`, newest first where rows carry a time
    pub fn list(&self, table: LogicalTable) -> Result<Vec<Record>> {
        let sql = format!("SELECT * FROM {} ORDER BY {}", table.name(), table.default_order());
        self.query(&sql, [])
    }

    /// Rows of `table` where any searchable column contains `term`.
    ///
    /// A blank term matches nothing.
    pub fn search(&self, table: LogicalTable, term: &str) -> Result<Vec<Record>> {
        let Some(term) = InputValidator::validate_search_term(term)? else {
            return Ok(Vec::new());
        };

        let filter = table
            .searchable_columns()
            .iter()
            .map(|column| format!("{column} LIKE ?1"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY {} LIMIT ?2",
            table.name(),
            filter,
            table.default_order()
        );
        let limit = i64::try_from(self.search_limit).unwrap_or(i64::MAX);

        let results = self.query(&sql, params![format!("%{term}%"), limit])?;
        debug!(%table, term, results = results.len(), "Search complete");
        Ok(results)
    }

    /// One entry per chat partner with their latest message, most recent first
    pub fn chat_threads(&self) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT c.{sender} AS name, c.{text} AS last_message, c.{time} AS time, c.{time_dt} AS time_dt
             FROM {table} c
             WHERE c.id = (
                 SELECT latest.id FROM {table} latest
                 WHERE latest.{sender} = c.{sender}
                 ORDER BY latest.{time_dt} DESC, latest.id DESC
                 LIMIT 1
             )
             AND c.{sender} <> ?1
             ORDER BY c.{time_dt} DESC",
            table = chat_messages::TABLE,
            sender = chat_messages::SENDER,
            text = chat_messages::TEXT,
            time = chat_messages::TIME,
            time_dt = chat_messages::TIME_DT,
        );
        self.query(&sql, [chat_messages::SELF_SENDER])
    }

    /// Chat with `name`, including the device owner's side, oldest first
    pub fn chat_conversation(&self, name: &str) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT * FROM {table} WHERE {sender} = ?1 OR {sender} = ?2 ORDER BY {time_dt} ASC, id ASC",
            table = chat_messages::TABLE,
            sender = chat_messages::SENDER,
            time_dt = chat_messages::TIME_DT,
        );
        self.query(&sql, [name.trim(), chat_messages::SELF_SENDER])
    }

    /// Text messages exchanged with `name`, newest first
    pub fn sms_conversation(&self, name: &str) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT * FROM {table} WHERE {from_to} = ?1 ORDER BY {time_dt} DESC, id DESC",
            table = sms_messages::TABLE,
            from_to = sms_messages::FROM_TO,
            time_dt = sms_messages::TIME_DT,
        );
        self.query(&sql, [name.trim()])
    }

    fn query<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Record>> {
        let conn = self.database.get_connection()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map(params, |row| to_record(row, &columns))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn to_record(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (i, name) in columns.iter().enumerate() {
        let value = match row.get_ref(i)? {
            ValueRef::Null | ValueRef::Blob(_) => JsonValue::Null,
            ValueRef::Integer(n) => JsonValue::from(n),
            ValueRef::Real(f) => Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number),
            ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        };
        record.insert(name.clone(), value);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> RecordRepository {
        let database = Database::new("sqlite::memory:").unwrap();
        {
            let conn = database.get_connection().unwrap();
            conn.execute_batch(
                "INSERT INTO chat_messages (sender, text, time, time_dt) VALUES
                    ('Alice', 'hi', 'Jan 05, 03:41 PM', '2026-01-05 15:41:00'),
                    ('You', 'hey', 'Jan 05, 03:42 PM', '2026-01-05 15:42:00'),
                    ('Alice', 'later', 'Jan 06, 09:00 AM', '2026-01-06 09:00:00'),
                    ('Bob', 'yo', 'Jan 04, 01:00 PM', '2026-01-04 13:00:00');",
            )
            .unwrap();
        }
        RecordRepository::new(database, 2)
    }

    #[test]
    fn test_chat_threads_latest_message_per_sender() {
        let threads = repository().chat_threads().unwrap();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0]["name"], "Alice");
        assert_eq!(threads[0]["last_message"], "later");
        assert_eq!(threads[1]["name"], "Bob");
    }

    #[test]
    fn test_chat_conversation_includes_own_messages_oldest_first() {
        let messages = repository().chat_conversation("Alice").unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m["text"].as_str().unwrap()).collect();
        assert_eq!(texts, vec!["hi", "hey", "later"]);
    }

    #[test]
    fn test_search_respects_limit_and_blank_terms() {
        let repo = repository();
        assert_eq!(repo.search(LogicalTable::ChatMessages, "   ").unwrap().len(), 0);
        assert_eq!(repo.search(LogicalTable::ChatMessages, "e").unwrap().len(), 2);
        assert_eq!(repo.search(LogicalTable::ChatMessages, "bob").unwrap().len(), 1);
    }
}
