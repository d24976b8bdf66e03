//! Error types for the forensic-ingest library.
//!
//! File-level failures abort the load of a single upload and are reported
//! back to the caller. Row-level parse problems are not errors; they surface
//! as [`RowParseWarning`](crate::models::RowParseWarning)s on the report.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::LogicalTable;

/// Errors that can occur while ingesting a dump.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Upload is neither `.csv` nor `.xlsx`
    #[error("Unsupported file type for {path}: expected .csv or .xlsx")]
    UnsupportedFileType {
        /// Offending upload
        path: PathBuf,
    },

    /// No registry signature is a subset of the file's columns
    #[error("Unrecognized schema: columns [{}] match no known table", columns.join(", "))]
    UnrecognizedSchema {
        /// Normalized column names found in the file
        columns: Vec<String>,
    },

    /// Classification matched but the table transform needs a column the file lacks
    #[error("Missing required field `{column}` for table {table}")]
    MissingRequiredField {
        /// Table the file was classified as
        table: LogicalTable,
        /// Absent column
        column: String,
    },

    /// Appending to the persisted store failed
    #[error("Failed to write {table}: {source}")]
    StoreWriteFailure {
        /// Target table
        table: LogicalTable,
        /// Underlying database error
        #[source]
        source: rusqlite::Error,
    },

    /// The upload could not be parsed as a table
    #[error("Failed to read {path}: {reason}")]
    FileRead {
        /// Upload being read
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet reading errors
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Rejected input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for Result with IngestError
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    /// Short machine-readable kind, used in reports and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFileType { .. } => "unsupported_file_type",
            Self::UnrecognizedSchema { .. } => "unrecognized_schema",
            Self::MissingRequiredField { .. } => "missing_required_field",
            Self::StoreWriteFailure { .. } => "store_write_failure",
            Self::FileRead { .. } | Self::Csv(_) | Self::Spreadsheet(_) => "file_read",
            Self::Database(_) | Self::Pool(_) => "database",
            Self::Io(_) => "io",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}
