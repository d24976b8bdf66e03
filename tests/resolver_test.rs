use tempfile::tempdir;

use forensic_ingest::models::NewContact;
use forensic_ingest::resolver::{ReferenceKeys, ReferenceResolver};
use forensic_ingest::{Database, LogicalTable};

fn database() -> (tempfile::TempDir, Database) {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());
    let db = Database::new(&db_url).expect("Failed to create database");
    (temp_dir, db)
}

fn contact(name: &str) -> NewContact {
    NewContact {
        name: name.to_string(),
        phone_number: None,
        email: None,
        last_contacted: None,
        last_contacted_dt: None,
    }
}

#[test]
fn test_same_contact_name_resolves_to_one_row() {
    let (_dir, db) = database();
    let conn = db.get_connection().unwrap();
    let resolver = ReferenceResolver::new(&conn);

    let first = resolver.resolve_contact("Alice", Some("555-0100"), None).unwrap();
    let second = resolver.resolve_contact("Alice", None, Some("alice@example.com")).unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(db.count(LogicalTable::Contacts).unwrap(), 1);

    // The first sighting's details stick
    let (phone, email): (Option<String>, Option<String>) = conn
        .query_row("SELECT phone_number, email FROM contacts", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(phone.as_deref(), Some("555-0100"));
    assert_eq!(email, None);
}

#[test]
fn test_empty_location_creates_nothing() {
    let (_dir, db) = database();
    let conn = db.get_connection().unwrap();
    let resolver = ReferenceResolver::new(&conn);

    assert_eq!(resolver.resolve_location("").unwrap(), None);
    assert_eq!(resolver.resolve_location("   ").unwrap(), None);
    assert_eq!(db.count(LogicalTable::Locations).unwrap(), 0);
}

#[test]
fn test_get_or_create_reports_creation() {
    let (_dir, db) = database();
    let conn = db.get_connection().unwrap();
    let resolver = ReferenceResolver::new(&conn);

    let created = resolver.get_or_create_location("Home").unwrap().unwrap();
    let found = resolver.get_or_create_location(" Home ").unwrap().unwrap();
    assert!(created.created);
    assert!(!found.created);
    assert_eq!(created.id, found.id);
}

#[test]
fn test_resolve_all_builds_lookup() {
    let (_dir, db) = database();
    let conn = db.get_connection().unwrap();
    let resolver = ReferenceResolver::new(&conn);
    resolver.resolve_contact("Bob", None, None).unwrap();

    let mut keys = ReferenceKeys::default();
    keys.add_contact(contact("Alice"));
    keys.add_contact(contact("Bob"));
    keys.add_contact(contact(""));
    keys.add_location("Home");

    let lookup = resolver.resolve_all(&keys).unwrap();
    assert_eq!(lookup.created, 2);
    assert!(lookup.contact("Alice").is_some());
    assert!(lookup.contact("Bob").is_some());
    assert_eq!(lookup.contact(""), None);
    assert!(lookup.location("Home").is_some());
    assert_eq!(lookup.location("Work"), None);
    assert_eq!(db.count(LogicalTable::Contacts).unwrap(), 2);
}

#[test]
fn test_rolled_back_transaction_leaves_no_references() {
    let (_dir, db) = database();
    let mut conn = db.get_connection().unwrap();
    {
        let tx = conn.transaction().unwrap();
        let resolver = ReferenceResolver::new(&tx);
        resolver.resolve_contact("Alice", None, None).unwrap();
        resolver.resolve_location("Home").unwrap();
        // dropped without commit
    }
    drop(conn);
    assert_eq!(db.count(LogicalTable::Contacts).unwrap(), 0);
    assert_eq!(db.count(LogicalTable::Locations).unwrap(), 0);
}

#[test]
fn test_surrogate_keys_are_not_reused() {
    let (_dir, db) = database();
    let conn = db.get_connection().unwrap();
    let resolver = ReferenceResolver::new(&conn);

    let first = resolver.resolve_location("Home").unwrap().unwrap();
    conn.execute("DELETE FROM locations", []).unwrap();
    let second = resolver.resolve_location("Work").unwrap().unwrap();
    assert!(second > first);
}
