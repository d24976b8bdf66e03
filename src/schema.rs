//! Database schema definitions and the table registry
//!
//! Column and table name constants for every persisted table, plus
//! [`LogicalTable`], the closed set of record categories an uploaded dump can
//! be classified as. Registry order is significant: classification walks
//! [`LogicalTable::ALL`] front to back and the first matching signature wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Contacts table schema
pub mod contacts {
    /// Table name
    pub const TABLE: &str = "contacts";
    /// Surrogate key column
    pub const ID: &str = "contact_id";
    /// Contact name column (dedup key)
    pub const NAME: &str = "name";
    /// Phone number column
    pub const PHONE_NUMBER: &str = "phone_number";
    /// Email address column
    pub const EMAIL: &str = "email";
    /// Raw "last contacted" value as found in the dump
    pub const LAST_CONTACTED: &str = "last_contacted";
    /// Parsed "last contacted" timestamp
    pub const LAST_CONTACTED_DT: &str = "last_contacted_dt";
}

/// Locations table schema
pub mod locations {
    /// Table name
    pub const TABLE: &str = "locations";
    /// Surrogate key column
    pub const ID: &str = "location_id";
    /// Location text column (dedup key)
    pub const TEXT: &str = "location_text";
}

/// Keylogs table schema
pub mod keylogs {
    /// Table name
    pub const TABLE: &str = "keylogs";
    /// Application the keys were typed into
    pub const APPLICATION: &str = "application";
    /// Raw timestamp column
    pub const TIME: &str = "time";
    /// Parsed timestamp column
    pub const TIME_DT: &str = "time_dt";
    /// Captured text column
    pub const TEXT: &str = "text";
}

/// SMS messages table schema
pub mod sms_messages {
    /// Table name
    pub const TABLE: &str = "sms_messages";
    /// Counterparty column
    pub const FROM_TO: &str = "from_to";
    /// Message body column
    pub const TEXT: &str = "text";
    /// Raw timestamp column
    pub const TIME: &str = "time";
    /// Parsed timestamp column
    pub const TIME_DT: &str = "time_dt";
    /// Foreign key to contacts
    pub const CONTACT_ID: &str = "contact_id";
    /// Foreign key to locations
    pub const LOCATION_ID: &str = "location_id";
}

/// Chat messages table schema
pub mod chat_messages {
    /// Table name
    pub const TABLE: &str = "chat_messages";
    /// Sender column
    pub const SENDER: &str = "sender";
    /// Message body column
    pub const TEXT: &str = "text";
    /// Raw timestamp column
    pub const TIME: &str = "time";
    /// Parsed timestamp column
    pub const TIME_DT: &str = "time_dt";
    /// Foreign key to contacts
    pub const CONTACT_ID: &str = "contact_id";
    /// Foreign key to locations
    pub const LOCATION_ID: &str = "location_id";
    /// Sender value used by dumps for the device owner
    pub const SELF_SENDER: &str = "You";
}

/// Calls table schema
pub mod calls {
    /// Table name
    pub const TABLE: &str = "calls";
    /// Counterparty column
    pub const FROM_TO: &str = "from_to";
    /// Incoming/outgoing/missed column
    pub const CALL_TYPE: &str = "call_type";
    /// Raw timestamp column
    pub const TIME: &str = "time";
    /// Parsed timestamp column
    pub const TIME_DT: &str = "time_dt";
    /// Duration in seconds
    pub const DURATION: &str = "duration";
    /// Foreign key to contacts
    pub const CONTACT_ID: &str = "contact_id";
    /// Foreign key to locations
    pub const LOCATION_ID: &str = "location_id";
}

/// Installed applications table schema
pub mod installedapps {
    /// Table name
    pub const TABLE: &str = "installedapps";
    /// Display name column
    pub const APPLICATION_NAME: &str = "application_name";
    /// Package identifier column
    pub const PACKAGE_NAME: &str = "package_name";
    /// Raw install date column
    pub const INSTALLED_DATE: &str = "installed_date";
    /// Parsed install date column
    pub const INSTALLED_DT: &str = "installed_dt";
}

/// Input column carrying a free-form location in fact dumps
pub const LOCATION_INPUT: &str = "location";
/// Input column some contact dumps use instead of `email`
pub const EMAIL_ID_INPUT: &str = "email_id";

/// One of the seven record categories a dump can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalTable {
    /// Captured keystrokes
    Keylogs,
    /// SMS messages
    SmsMessages,
    /// Messenger chat messages
    ChatMessages,
    /// Address book entries
    Contacts,
    /// Call log
    Calls,
    /// Installed applications
    Installedapps,
    /// Known locations
    Locations,
}

impl LogicalTable {
    /// Every table in registry declaration order.
    pub const ALL: [Self; 7] = [
        Self::Keylogs,
        Self::SmsMessages,
        Self::ChatMessages,
        Self::Contacts,
        Self::Calls,
        Self::Installedapps,
        Self::Locations,
    ];

    /// Persisted table name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Keylogs => keylogs::TABLE,
            Self::SmsMessages => sms_messages::TABLE,
            Self::ChatMessages => chat_messages::TABLE,
            Self::Contacts => contacts::TABLE,
            Self::Calls => calls::TABLE,
            Self::Installedapps => installedapps::TABLE,
            Self::Locations => locations::TABLE,
        }
    }

    /// Minimal column set that identifies a dump as this table.
    #[must_use]
    pub const fn signature(self) -> &'static [&'static str] {
        match self {
            Self::Keylogs => &[keylogs::APPLICATION, keylogs::TIME, keylogs::TEXT],
            Self::SmsMessages => &[sms_messages::FROM_TO, sms_messages::TEXT, sms_messages::TIME],
            Self::ChatMessages => &[chat_messages::SENDER, chat_messages::TEXT, chat_messages::TIME],
            Self::Contacts => &[contacts::NAME, contacts::PHONE_NUMBER],
            Self::Calls => &[calls::FROM_TO, calls::CALL_TYPE, calls::TIME],
            Self::Installedapps => &[installedapps::APPLICATION_NAME, installedapps::PACKAGE_NAME],
            Self::Locations => &[LOCATION_INPUT],
        }
    }

    /// Input columns the table's transform needs, a superset of [`signature`](Self::signature).
    #[must_use]
    pub const fn required_input(self) -> &'static [&'static str] {
        match self {
            Self::Calls => &[
                calls::FROM_TO,
                calls::CALL_TYPE,
                calls::TIME,
                calls::DURATION,
                LOCATION_INPUT,
            ],
            other => other.signature(),
        }
    }

    /// Columns written by the loader, in insert order. Auto-assigned keys are excluded.
    #[must_use]
    pub const fn persisted_columns(self) -> &'static [&'static str] {
        match self {
            Self::Keylogs => &[keylogs::APPLICATION, keylogs::TIME, keylogs::TIME_DT, keylogs::TEXT],
            Self::SmsMessages => &[
                sms_messages::FROM_TO,
                sms_messages::TEXT,
                sms_messages::TIME,
                sms_messages::TIME_DT,
                sms_messages::CONTACT_ID,
                sms_messages::LOCATION_ID,
            ],
            Self::ChatMessages => &[
                chat_messages::SENDER,
                chat_messages::TEXT,
                chat_messages::TIME,
                chat_messages::TIME_DT,
                chat_messages::CONTACT_ID,
                chat_messages::LOCATION_ID,
            ],
            Self::Contacts => &[
                contacts::NAME,
                contacts::PHONE_NUMBER,
                contacts::EMAIL,
                contacts::LAST_CONTACTED,
                contacts::LAST_CONTACTED_DT,
            ],
            Self::Calls => &[
                calls::FROM_TO,
                calls::CALL_TYPE,
                calls::TIME,
                calls::TIME_DT,
                calls::DURATION,
                calls::CONTACT_ID,
                calls::LOCATION_ID,
            ],
            Self::Installedapps => &[
                installedapps::APPLICATION_NAME,
                installedapps::PACKAGE_NAME,
                installedapps::INSTALLED_DATE,
                installedapps::INSTALLED_DT,
            ],
            Self::Locations => &[locations::TEXT],
        }
    }

    /// Columns matched by free-text search.
    #[must_use]
    pub const fn searchable_columns(self) -> &'static [&'static str] {
        match self {
            Self::Keylogs => &[keylogs::APPLICATION, keylogs::TEXT],
            Self::SmsMessages => &[sms_messages::FROM_TO, sms_messages::TEXT],
            Self::ChatMessages => &[chat_messages::SENDER, chat_messages::TEXT],
            Self::Contacts => &[contacts::NAME, contacts::PHONE_NUMBER, contacts::EMAIL],
            Self::Calls => &[calls::FROM_TO, calls::CALL_TYPE],
            Self::Installedapps => &[installedapps::APPLICATION_NAME, installedapps::PACKAGE_NAME],
            Self::Locations => &[locations::TEXT],
        }
    }

    /// `ORDER BY` clause used when listing or searching.
    #[must_use]
    pub const fn default_order(self) -> &'static str {
        match self {
            Self::Keylogs | Self::SmsMessages | Self::ChatMessages | Self::Calls => "time_dt DESC",
            Self::Contacts => "name ASC",
            Self::Installedapps => "application_name ASC",
            Self::Locations => "location_text ASC",
        }
    }

    /// True for the deduplicated reference tables (contacts, locations).
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::Contacts | Self::Locations)
    }
}

impl fmt::Display for LogicalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogicalTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|table| table.name() == wanted)
            .ok_or_else(|| format!("unknown table: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_is_fixed() {
        let names: Vec<_> = LogicalTable::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "keylogs",
                "sms_messages",
                "chat_messages",
                "contacts",
                "calls",
                "installedapps",
                "locations"
            ]
        );
    }

    #[test]
    fn test_required_input_covers_signature() {
        for table in LogicalTable::ALL {
            for column in table.signature() {
                assert!(table.required_input().contains(column), "{table}: {column}");
            }
        }
    }

    #[test]
    fn test_calls_require_more_than_signature() {
        let required = LogicalTable::Calls.required_input();
        assert!(required.contains(&"duration"));
        assert!(required.contains(&"location"));
        assert!(!LogicalTable::Calls.signature().contains(&"duration"));
    }

    #[test]
    fn test_from_str_round_trip() {
        assert_eq!("SMS_MESSAGES".parse::<LogicalTable>(), Ok(LogicalTable::SmsMessages));
        assert!("messages".parse::<LogicalTable>().is_err());
    }
}
