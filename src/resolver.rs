//! Get-or-create resolution of contact and location references.
//!
//! Resolution is a separate phase: the normalizer first collects the distinct
//! keys a batch refers to ([`ReferenceKeys`]), they are resolved here into a
//! [`ReferenceLookup`], and only then are rows mapped through that lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::Result;
use crate::models::{NewContact, Resolved};
use crate::schema::{contacts, locations};

/// Distinct references collected from one batch, in key order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceKeys {
    /// Contacts keyed by name; the first row mentioning a name supplies its details
    pub contacts: BTreeMap<String, NewContact>,
    /// Non-empty location texts
    pub locations: BTreeSet<String>,
}

impl ReferenceKeys {
    /// Remember a contact reference unless the name is empty or already seen.
    pub fn add_contact(&mut self, contact: NewContact) {
        if contact.name.is_empty() {
            return;
        }
        self.contacts.entry(contact.name.clone()).or_insert(contact);
    }

    /// Remember a location reference unless it is empty.
    pub fn add_location(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.locations.insert(text.to_string());
        }
    }
}

/// Natural key to surrogate key mapping produced by [`ReferenceResolver::resolve_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceLookup {
    contacts: HashMap<String, i64>,
    locations: HashMap<String, i64>,
    /// Rows inserted while building this lookup
    pub created: usize,
}

impl ReferenceLookup {
    /// Surrogate key for a contact name; `None` for empty or unknown names.
    #[must_use]
    pub fn contact(&self, name: &str) -> Option<i64> {
        self.contacts.get(name.trim()).copied()
    }

    /// Surrogate key for a location text; `None` for empty or unknown texts.
    #[must_use]
    pub fn location(&self, text: &str) -> Option<i64> {
        self.locations.get(text.trim()).copied()
    }
}

/// Resolves references against the store through an explicitly passed connection.
///
/// Callers pass the per-file transaction so that rows created here roll back
/// with the rest of a failed load.
#[derive(Debug)]
pub struct ReferenceResolver<'c> {
    conn: &'c Connection,
}

impl<'c> ReferenceResolver<'c> {
    /// Create a resolver on `conn`
    #[must_use]
    pub const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Get or create the contact named `contact.name`.
    ///
    /// Existing contacts are returned untouched; the other fields only apply
    /// when the row is created. The insert uses `ON CONFLICT DO NOTHING` on
    /// the unique name, so racing writers cannot create a second row.
    pub fn get_or_create_contact(&self, contact: &NewContact) -> Result<Resolved> {
        let inserted = self.conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT({}) DO NOTHING",
                contacts::TABLE,
                contacts::NAME,
                contacts::PHONE_NUMBER,
                contacts::EMAIL,
                contacts::LAST_CONTACTED,
                contacts::LAST_CONTACTED_DT,
                contacts::NAME
            ),
            params![
                contact.name,
                contact.phone_number,
                contact.email,
                contact.last_contacted,
                contact.last_contacted_dt
            ],
        )?;

        let id: i64 = self.conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE {} = ?1",
                contacts::ID,
                contacts::TABLE,
                contacts::NAME
            ),
            params![contact.name],
            |row| row.get(0),
        )?;

        Ok(Resolved {
            id,
            created: inserted > 0,
        })
    }

    /// Get or create the location with exactly `text`.
    ///
    /// Empty or whitespace-only text resolves to `None` without touching the store.
    pub fn get_or_create_location(&self, text: &str) -> Result<Option<Resolved>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let inserted = self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1) ON CONFLICT({}) DO NOTHING",
                locations::TABLE,
                locations::TEXT,
                locations::TEXT
            ),
            params![text],
        )?;

        let id: i64 = self.conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE {} = ?1",
                locations::ID,
                locations::TABLE,
                locations::TEXT
            ),
            params![text],
            |row| row.get(0),
        )?;

        Ok(Some(Resolved {
            id,
            created: inserted > 0,
        }))
    }

    /// Surrogate key for `name`, creating the contact on first sight.
    ///
    /// Returns `None` for an empty name.
    pub fn resolve_contact(
        &self,
        name: &str,
        phone_number: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<i64>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let resolved = self.get_or_create_contact(&NewContact {
            name: name.to_string(),
            phone_number: phone_number.map(ToString::to_string),
            email: email.map(ToString::to_string),
            last_contacted: None,
            last_contacted_dt: None,
        })?;
        Ok(Some(resolved.id))
    }

    /// Surrogate key for `text`, or `None` for empty input.
    pub fn resolve_location(&self, text: &str) -> Result<Option<i64>> {
        Ok(self.get_or_create_location(text)?.map(|r| r.id))
    }

    /// Resolve every collected key into a lookup table.
    pub fn resolve_all(&self, keys: &ReferenceKeys) -> Result<ReferenceLookup> {
        let mut lookup = ReferenceLookup::default();

        for (name, contact) in &keys.contacts {
            let resolved = self.get_or_create_contact(contact)?;
            lookup.created += usize::from(resolved.created);
            lookup.contacts.insert(name.clone(), resolved.id);
        }

        for text in &keys.locations {
            if let Some(resolved) = self.get_or_create_location(text)? {
                lookup.created += usize::from(resolved.created);
                lookup.locations.insert(text.clone(), resolved.id);
            }
        }

        debug!(
            contacts = lookup.contacts.len(),
            locations = lookup.locations.len(),
            created = lookup.created,
            "Resolved references"
        );
        Ok(lookup)
    }
}
