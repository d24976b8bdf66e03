use std::collections::HashMap;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::validation::InputValidator;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Where audit copies of loaded rows are written
    pub audit_directory: String,
    /// Year assumed for year-less dump timestamps; the current year when unset
    pub default_year: Option<i32>,
    /// Maximum rows returned by a search
    pub search_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/forensics.db".to_string(),
                max_connections: 4,
                connection_timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            ingest: IngestConfig {
                audit_directory: "./audit".to_string(),
                default_year: None,
                search_limit: 50,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        // Start with default values
        for (key, value) in Self::default().default_entries() {
            builder = builder.set_default(key, value)?;
        }

        let config = builder
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("FORENSIC_INGEST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        InputValidator::validate_database_url(&self.database.url)?;
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate ingest config
        if self.ingest.audit_directory.trim().is_empty() {
            return Err(anyhow::anyhow!("audit_directory cannot be empty"));
        }
        if self.ingest.search_limit == 0 {
            return Err(anyhow::anyhow!("search_limit must be greater than 0"));
        }
        if let Some(year) = self.ingest.default_year {
            InputValidator::validate_default_year(year)?;
        }

        Ok(())
    }

    /// Get database URL from environment or config
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Flatten the configuration into dotted key-value pairs for `config` defaults
    fn default_entries(self) -> HashMap<&'static str, config::Value> {
        let mut map = HashMap::new();

        map.insert("database.url", config::Value::from(self.database.url));
        map.insert("database.max_connections", config::Value::from(i64::from(self.database.max_connections)));
        map.insert(
            "database.connection_timeout_secs",
            config::Value::from(i64::try_from(self.database.connection_timeout_secs).unwrap_or(i64::MAX)),
        );

        map.insert("logging.level", config::Value::from(self.logging.level));
        if let Some(file_path) = self.logging.file_path {
            map.insert("logging.file_path", config::Value::from(file_path));
        }
        map.insert("logging.format", config::Value::from(self.logging.format));

        map.insert("ingest.audit_directory", config::Value::from(self.ingest.audit_directory));
        if let Some(year) = self.ingest.default_year {
            map.insert("ingest.default_year", config::Value::from(i64::from(year)));
        }
        map.insert(
            "ingest.search_limit",
            config::Value::from(i64::try_from(self.ingest.search_limit).unwrap_or(i64::MAX)),
        );

        map
    }
}
