//! Per-table field normalization.
//!
//! Each [`LogicalTable`] has one transform. Transforms trim every text cell,
//! parse `"Mon DD, HH:MM AM/PM"` timestamps, coerce call durations, and map
//! contact and location references through a pre-built [`ReferenceLookup`].
//! Row-level parse failures become NULL cells plus a [`RowParseWarning`];
//! they never fail the batch.

use chrono::NaiveDateTime;

use crate::error::{IngestError, Result};
use crate::models::{NewContact, NormalizedBatch, RawRecordBatch, RowParseWarning, Value};
use crate::resolver::{ReferenceKeys, ReferenceLookup};
use crate::schema::{
    calls, chat_messages, contacts, installedapps, keylogs, sms_messages, LogicalTable,
    EMAIL_ID_INPUT, LOCATION_INPUT,
};
use crate::validation::InputValidator;

/// Layout of timestamps in extraction dumps
pub const SOURCE_TIME_FORMAT: &str = "%b %d, %I:%M %p";

/// Inputs the transforms need besides the batch itself.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
    /// Year assumed for year-less source timestamps
    pub year: i32,
    /// Current time, used for default "last contacted" values
    pub now: NaiveDateTime,
}

/// Parse a source timestamp such as `"Jan 05, 03:41 PM"` in `year`.
#[must_use]
pub fn parse_timestamp(raw: &str, year: i32) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{year} {raw}"), &format!("%Y {SOURCE_TIME_FORMAT}")).ok()
}

/// Render a timestamp the way dumps write them.
#[must_use]
pub fn format_source_timestamp(dt: NaiveDateTime) -> String {
    dt.format(SOURCE_TIME_FORMAT).to_string()
}

/// Coerce a free-form duration such as `"45 sec"` to whole seconds.
///
/// All non-digit characters are dropped; nothing left means zero. Returns
/// `None` only when the digits overflow.
#[must_use]
pub fn parse_duration(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

/// Fail with [`IngestError::MissingRequiredField`] if the transform for `table`
/// needs a column the batch lacks.
pub fn check_required_columns(table: LogicalTable, batch: &RawRecordBatch) -> Result<()> {
    match table
        .required_input()
        .iter()
        .find(|column| !batch.has_column(column))
    {
        Some(column) => Err(IngestError::MissingRequiredField {
            table,
            column: (*column).to_string(),
        }),
        None => Ok(()),
    }
}

/// Collect the contact and location references a batch will need resolved.
#[must_use]
pub fn collect_references(
    table: LogicalTable,
    batch: &RawRecordBatch,
    ctx: &NormalizeContext,
) -> ReferenceKeys {
    let mut keys = ReferenceKeys::default();
    let contact_column = match table {
        LogicalTable::SmsMessages => sms_messages::FROM_TO,
        LogicalTable::ChatMessages => chat_messages::SENDER,
        LogicalTable::Calls => calls::FROM_TO,
        _ => return keys,
    };

    for index in 0..batch.len() {
        let row = RowView { batch, index };
        let name = row.text(contact_column);
        let phone_number = InputValidator::looks_like_phone(&name).then(|| name.clone());
        keys.add_contact(NewContact {
            name,
            phone_number,
            email: None,
            last_contacted: Some(format_source_timestamp(ctx.now)),
            last_contacted_dt: Some(ctx.now),
        });
        if let Some(location) = row.opt_text(LOCATION_INPUT) {
            keys.add_location(&location);
        }
    }
    keys
}

/// Transform a classified batch into canonical rows for `table`.
pub fn normalize(
    table: LogicalTable,
    batch: &RawRecordBatch,
    lookup: &ReferenceLookup,
    ctx: &NormalizeContext,
) -> Result<NormalizedBatch> {
    check_required_columns(table, batch)?;

    let mut out = Normalizer {
        ctx,
        lookup,
        rows: Vec::with_capacity(batch.len()),
        warnings: Vec::new(),
    };

    for index in 0..batch.len() {
        let row = RowView { batch, index };
        match table {
            LogicalTable::Keylogs => out.keylog(&row),
            LogicalTable::SmsMessages => out.sms(&row),
            LogicalTable::ChatMessages => out.chat(&row),
            LogicalTable::Contacts => out.contact(&row),
            LogicalTable::Calls => out.call(&row),
            LogicalTable::Installedapps => out.installed_app(&row),
            LogicalTable::Locations => out.location(&row),
        }
    }

    Ok(NormalizedBatch {
        table,
        rows: out.rows,
        warnings: out.warnings,
    })
}

struct RowView<'a> {
    batch: &'a RawRecordBatch,
    index: usize,
}

impl RowView<'_> {
    fn raw(&self, column: &str) -> Option<&str> {
        let i = self.batch.column_index(column)?;
        self.batch.rows.get(self.index)?.get(i).map(String::as_str)
    }

    /// Trimmed cell, empty if the column is absent.
    fn text(&self, column: &str) -> String {
        self.raw(column).unwrap_or_default().trim().to_string()
    }

    /// Trimmed cell, `None` if the column is absent or the cell is blank.
    fn opt_text(&self, column: &str) -> Option<String> {
        self.raw(column)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }
}

struct Normalizer<'a> {
    ctx: &'a NormalizeContext,
    lookup: &'a ReferenceLookup,
    rows: Vec<Vec<Value>>,
    warnings: Vec<RowParseWarning>,
}

impl Normalizer<'_> {
    fn warn(&mut self, row: &RowView<'_>, column: &str, value: &str, reason: &str) {
        self.warnings.push(RowParseWarning {
            row: row.index,
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        });
    }

    fn timestamp(&mut self, row: &RowView<'_>, column: &str) -> (Value, Value) {
        let Some(raw) = row.opt_text(column) else {
            return (Value::Null, Value::Null);
        };
        let parsed = parse_timestamp(&raw, self.ctx.year);
        if parsed.is_none() {
            self.warn(row, column, &raw, "expected `Mon DD, HH:MM AM/PM`");
        }
        (Value::Text(raw), Value::from_datetime(parsed))
    }

    fn contact_ref(&self, row: &RowView<'_>, column: &str) -> Value {
        self.lookup.contact(&row.text(column)).into()
    }

    fn location_ref(&self, row: &RowView<'_>) -> Value {
        row.opt_text(LOCATION_INPUT)
            .and_then(|text| self.lookup.location(&text))
            .into()
    }

    fn keylog(&mut self, row: &RowView<'_>) {
        let (time, time_dt) = self.timestamp(row, keylogs::TIME);
        self.rows.push(vec![
            Value::Text(row.text(keylogs::APPLICATION)),
            time,
            time_dt,
            Value::Text(row.text(keylogs::TEXT)),
        ]);
    }

    fn sms(&mut self, row: &RowView<'_>) {
        let (time, time_dt) = self.timestamp(row, sms_messages::TIME);
        let contact_id = self.contact_ref(row, sms_messages::FROM_TO);
        let location_id = self.location_ref(row);
        self.rows.push(vec![
            Value::Text(row.text(sms_messages::FROM_TO)),
            Value::Text(row.text(sms_messages::TEXT)),
            time,
            time_dt,
            contact_id,
            location_id,
        ]);
    }

    fn chat(&mut self, row: &RowView<'_>) {
        let (time, time_dt) = self.timestamp(row, chat_messages::TIME);
        let contact_id = self.contact_ref(row, chat_messages::SENDER);
        let location_id = self.location_ref(row);
        self.rows.push(vec![
            Value::Text(row.text(chat_messages::SENDER)),
            Value::Text(row.text(chat_messages::TEXT)),
            time,
            time_dt,
            contact_id,
            location_id,
        ]);
    }

    fn call(&mut self, row: &RowView<'_>) {
        let (time, time_dt) = self.timestamp(row, calls::TIME);
        let raw_duration = row.text(calls::DURATION);
        let duration = parse_duration(&raw_duration).unwrap_or_else(|| {
            self.warn(row, calls::DURATION, &raw_duration, "duration out of range");
            0
        });
        let contact_id = self.contact_ref(row, calls::FROM_TO);
        let location_id = self.location_ref(row);
        self.rows.push(vec![
            Value::Text(row.text(calls::FROM_TO)),
            Value::Text(row.text(calls::CALL_TYPE)),
            time,
            time_dt,
            Value::Integer(duration),
            contact_id,
            location_id,
        ]);
    }

    fn installed_app(&mut self, row: &RowView<'_>) {
        let (installed, installed_dt) = self.timestamp(row, installedapps::INSTALLED_DATE);
        self.rows.push(vec![
            Value::Text(row.text(installedapps::APPLICATION_NAME)),
            Value::Text(row.text(installedapps::PACKAGE_NAME)),
            installed,
            installed_dt,
        ]);
    }

    fn contact(&mut self, row: &RowView<'_>) {
        let name = row.text(contacts::NAME);
        if name.is_empty() {
            self.warn(row, contacts::NAME, "", "contact name is empty; row skipped");
            return;
        }

        let email = row
            .opt_text(contacts::EMAIL)
            .or_else(|| row.opt_text(EMAIL_ID_INPUT));

        let (last_contacted, last_contacted_dt) = if row.opt_text(contacts::LAST_CONTACTED).is_some() {
            self.timestamp(row, contacts::LAST_CONTACTED)
        } else {
            (
                Value::Text(format_source_timestamp(self.ctx.now)),
                Value::from_datetime(Some(self.ctx.now)),
            )
        };

        self.rows.push(vec![
            Value::Text(name),
            row.opt_text(contacts::PHONE_NUMBER).map_or(Value::Null, Value::Text),
            email.map_or(Value::Null, Value::Text),
            last_contacted,
            last_contacted_dt,
        ]);
    }

    fn location(&mut self, row: &RowView<'_>) {
        match row.opt_text(LOCATION_INPUT) {
            Some(text) => self.rows.push(vec![Value::Text(text)]),
            None => self.warn(row, LOCATION_INPUT, "", "location is empty; row skipped"),
        }
    }
}
