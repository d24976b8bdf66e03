use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, histogram};
use serde::Serialize;

use crate::schema::LogicalTable;

/// Metric names exported through the `metrics` facade
pub mod names {
    /// Uploads committed
    pub const FILES_INGESTED: &str = "forensic_ingest_files_ingested_total";
    /// Uploads rejected or rolled back
    pub const FILES_FAILED: &str = "forensic_ingest_files_failed_total";
    /// Rows written
    pub const ROWS_LOADED: &str = "forensic_ingest_rows_loaded_total";
    /// In-upload duplicate rows dropped
    pub const DUPLICATES_DROPPED: &str = "forensic_ingest_duplicates_dropped_total";
    /// Cells replaced by NULL during normalization
    pub const ROW_WARNINGS: &str = "forensic_ingest_row_warnings_total";
    /// Wall time per upload
    pub const INGEST_DURATION: &str = "forensic_ingest_file_duration_seconds";
}

/// Ingestion counters.
///
/// Every update is mirrored to the global `metrics` recorder, which is a
/// no-op unless the embedding application installs one. The local totals
/// back [`IngestMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct IngestMetrics {
    files_ingested: AtomicU64,
    files_failed: AtomicU64,
    rows_loaded: AtomicU64,
    duplicates_dropped: AtomicU64,
    row_warnings: AtomicU64,
}

/// Point-in-time copy of [`IngestMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Uploads committed successfully
    pub files_ingested: u64,
    /// Uploads rejected or rolled back
    pub files_failed: u64,
    /// Rows written across all committed uploads
    pub rows_loaded: u64,
    /// In-upload duplicates skipped
    pub duplicates_dropped: u64,
    /// Cells that failed to parse and were stored as NULL
    pub row_warnings: u64,
}

impl IngestMetrics {
    /// Zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed upload
    pub fn record_file_ingested(
        &self,
        table: LogicalTable,
        loaded: usize,
        duplicates: usize,
        warnings: usize,
        duration: Duration,
    ) {
        let (loaded, duplicates, warnings) = (as_u64(loaded), as_u64(duplicates), as_u64(warnings));

        self.files_ingested.fetch_add(1, Ordering::Relaxed);
        self.rows_loaded.fetch_add(loaded, Ordering::Relaxed);
        self.duplicates_dropped.fetch_add(duplicates, Ordering::Relaxed);
        self.row_warnings.fetch_add(warnings, Ordering::Relaxed);

        let table = table.name();
        counter!(names::FILES_INGESTED, "table" => table).increment(1);
        counter!(names::ROWS_LOADED, "table" => table).increment(loaded);
        counter!(names::DUPLICATES_DROPPED, "table" => table).increment(duplicates);
        counter!(names::ROW_WARNINGS, "table" => table).increment(warnings);
        histogram!(names::INGEST_DURATION, "table" => table).record(duration.as_secs_f64());
    }

    /// Record an upload that left nothing behind
    pub fn record_file_failed(&self, error_kind: &'static str) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
        counter!(names::FILES_FAILED, "kind" => error_kind).increment(1);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_ingested: self.files_ingested.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            rows_loaded: self.rows_loaded.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            row_warnings: self.row_warnings.load(Ordering::Relaxed),
        }
    }
}

fn as_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_start_at_zero() {
        assert_eq!(IngestMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_failed_files_do_not_touch_row_counts() {
        let metrics = IngestMetrics::new();
        metrics.record_file_failed("unrecognized_schema");
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_failed, 1);
        assert_eq!(snapshot.rows_loaded, 0);
    }
}
