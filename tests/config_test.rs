//! Unit tests for config.rs module

use forensic_ingest::config::AppConfig;

#[test]
fn test_default_config_values() {
    let config = AppConfig::default();

    assert_eq!(config.database.url, "sqlite:data/forensics.db");
    assert_eq!(config.database.max_connections, 4);
    assert_eq!(config.database.connection_timeout_secs, 30);
}

#[test]
fn test_default_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_default_ingest_config() {
    let config = AppConfig::default();

    assert_eq!(config.ingest.audit_directory, "./audit");
    assert_eq!(config.ingest.default_year, None);
    assert_eq!(config.ingest.search_limit, 50);
}

#[test]
fn test_config_validation_success() {
    assert!(AppConfig::default().validate().is_ok());
}

#[test]
fn test_config_validation_zero_connection_timeout() {
    let mut config = AppConfig::default();
    config.database.connection_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_non_sqlite_url() {
    let mut config = AppConfig::default();
    config.database.url = "postgres://localhost/forensics".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "verbose".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_log_format() {
    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_empty_audit_directory() {
    let mut config = AppConfig::default();
    config.ingest.audit_directory = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_search_limit() {
    let mut config = AppConfig::default();
    config.ingest.search_limit = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_default_year_range() {
    let mut config = AppConfig::default();
    config.ingest.default_year = Some(1900);
    assert!(config.validate().is_err());
    config.ingest.default_year = Some(2024);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_reads_prefixed_environment() {
    std::env::set_var("FORENSIC_INGEST_INGEST__SEARCH_LIMIT", "7");
    std::env::set_var("FORENSIC_INGEST_INGEST__DEFAULT_YEAR", "2023");
    let config = AppConfig::load();
    std::env::remove_var("FORENSIC_INGEST_INGEST__SEARCH_LIMIT");
    std::env::remove_var("FORENSIC_INGEST_INGEST__DEFAULT_YEAR");

    let config = config.unwrap();
    assert_eq!(config.ingest.search_limit, 7);
    assert_eq!(config.ingest.default_year, Some(2023));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_serialization() {
    let config = AppConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let back: AppConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.database.url, config.database.url);
    assert_eq!(back.ingest.search_limit, config.ingest.search_limit);
}
