use std::fs;
use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::schema::LogicalTable;
use crate::validation::InputValidator;

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const MEMORY_PATH: &str = ":memory:";

/// Database manager for handling connections and migrations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool with default settings
    pub fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_settings(database_url, 4, Duration::from_secs(30))
    }

    /// Create a pool sized and timed from configuration
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::with_pool_settings(
            &config.url,
            config.max_connections,
            Duration::from_secs(config.connection_timeout_secs),
        )
    }

    fn with_pool_settings(database_url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        InputValidator::validate_database_url(database_url)?;
        let path = database_path(database_url);

        let (manager, max_connections) = if path == MEMORY_PATH {
            // Every in-memory connection is its own database, so share one.
            (SqliteConnectionManager::memory(), 1)
        } else {
            // Create parent directory if it doesn't exist
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            (SqliteConnectionManager::file(path), max_connections)
        };

        let manager = manager.with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let mut builder = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(timeout);
        if path == MEMORY_PATH {
            builder = builder.idle_timeout(None).max_lifetime(None);
        }
        let pool = builder.build(manager)?;

        // Run migrations
        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        info!(path, max_connections, "Database ready");

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2026-10-19-000000_create_tables/up.sql"))?;
        debug!("Migrations applied");
        Ok(())
    }

    /// Get a connection from the pool
    ///
    /// The connection returns to the pool when dropped.
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Number of rows currently stored in `table`
    pub fn count(&self, table: LogicalTable) -> Result<usize> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Strip the `sqlite:` / `sqlite://` scheme from a database URL.
#[must_use]
pub fn database_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path() {
        assert_eq!(database_path("sqlite:data/forensics.db"), "data/forensics.db");
        assert_eq!(database_path("sqlite:///tmp/x.db"), "/tmp/x.db");
        assert_eq!(database_path("sqlite::memory:"), ":memory:");
    }

    #[test]
    fn test_in_memory_database_has_all_tables() {
        let db = Database::new("sqlite::memory:").unwrap();
        for table in LogicalTable::ALL {
            assert_eq!(db.count(table).unwrap(), 0);
        }
    }

    #[test]
    fn test_rejects_non_sqlite_url() {
        assert!(Database::new("postgres://localhost/x").is_err());
    }
}
