//! Forensic Ingest - Extraction Dump Loader
//!
//! A Rust library for loading forensic phone-extraction spreadsheets (SMS,
//! chats, calls, contacts, keylogs, installed apps, locations) into one
//! normalized SQLite store and reading them back.
//!
//! # Features
//!
//! - CSV and XLSX uploads, classified by their column headers
//! - Timestamp, duration and whitespace normalization with per-row warnings
//! - Deduplicated contacts and locations with stable surrogate keys
//! - In-upload duplicate removal and a CSV audit copy of every load
//! - One transaction per upload
//! - Listing, search and conversation views over the stored records

/// Column-signature classification of uploads
pub mod classifier;
/// Wall-clock seam
pub mod clock;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Audit copy writing
pub mod file_writer;
/// Deduplicating loader
pub mod loader;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Per-table field normalization
pub mod normalize;
/// CSV and XLSX readers
pub mod reader;
/// Read access to stored records
pub mod repository;
/// Contact and location get-or-create
pub mod resolver;
/// Table registry and column names
pub mod schema;
/// Ingestion orchestration
pub mod service;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{IngestError, Result};
pub use models::{IngestReport, RowParseWarning};
pub use repository::RecordRepository;
pub use schema::LogicalTable;
pub use service::IngestionService;
