use std::path::Path;

use crate::error::{IngestError, Result};
use crate::models::UploadFormat;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Check an upload path and return its format.
    ///
    /// Only the extension is inspected; the file is not opened.
    pub fn validate_upload_path(path: &Path) -> Result<UploadFormat> {
        if path.as_os_str().is_empty() {
            return Err(IngestError::InvalidInput("File path cannot be empty".to_string()));
        }

        if path.to_string_lossy().len() > 4096 {
            return Err(IngestError::InvalidInput(
                "File path too long (max 4096 characters)".to_string(),
            ));
        }

        UploadFormat::from_path(path).ok_or_else(|| IngestError::UnsupportedFileType {
            path: path.to_path_buf(),
        })
    }

    /// True if `value` reads as a phone number rather than a display name.
    #[must_use]
    pub fn looks_like_phone(value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
        {
            return false;
        }

        if value.chars().skip(1).any(|c| c == '+') {
            return false;
        }

        let digits = value.chars().filter(char::is_ascii_digit).count();
        (7..=15).contains(&digits)
    }

    /// Normalize a search term, rejecting oversized input.
    ///
    /// Returns `None` for an empty term, which searches nothing.
    pub fn validate_search_term(term: &str) -> Result<Option<String>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(None);
        }

        if term.len() > 200 {
            return Err(IngestError::InvalidInput(
                "Search term too long (max 200 characters)".to_string(),
            ));
        }

        Ok(Some(term.to_string()))
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(IngestError::InvalidInput("Database URL cannot be empty".to_string()));
        }

        if !url.starts_with("sqlite:") {
            return Err(IngestError::InvalidInput(
                "Only SQLite databases are supported".to_string(),
            ));
        }

        if url.len() > 1000 {
            return Err(IngestError::InvalidInput("Database URL too long".to_string()));
        }

        Ok(())
    }

    /// Validate the year assumed for year-less timestamps
    pub fn validate_default_year(year: i32) -> Result<()> {
        if !(1970..=9999).contains(&year) {
            return Err(IngestError::InvalidInput(format!(
                "Default year {year} out of range (1970-9999)"
            )));
        }

        Ok(())
    }
}
