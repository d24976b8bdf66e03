//! Ingestion orchestrator.
//!
//! Drives one upload through validation, reading, classification,
//! reference resolution, normalization and loading. Each upload gets its own
//! pooled connection and transaction, so a failed file leaves no rows behind
//! and never affects the files ingested before it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Datelike;
use tracing::{info, info_span, warn};

use crate::classifier::classify;
use crate::clock::{Clock, SystemClock};
use crate::config::IngestConfig;
use crate::db::Database;
use crate::error::{IngestError, Result};
use crate::loader::{self, AuditTarget};
use crate::logging::OperationTimer;
use crate::metrics::IngestMetrics;
use crate::models::IngestReport;
use crate::normalize::{check_required_columns, collect_references, normalize, NormalizeContext};
use crate::reader::read_batch;
use crate::resolver::ReferenceResolver;
use crate::validation::InputValidator;

/// Runs uploads through classify, normalize, resolve and load.
///
/// Each file is committed in its own transaction; a failing file never
/// undoes files ingested before it.
pub struct IngestionService {
    database: Database,
    config: IngestConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<IngestMetrics>,
}

impl IngestionService {
    /// Service stamped with the system clock
    #[must_use]
    pub fn new(database: Database, config: IngestConfig) -> Self {
        Self::with_clock(database, config, Arc::new(SystemClock))
    }

    /// Service with an injected clock, used for the timestamp year and
    /// audit file names.
    #[must_use]
    pub fn with_clock(database: Database, config: IngestConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            database,
            config,
            clock,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Counters accumulated by this service
    #[must_use]
    pub fn metrics(&self) -> &IngestMetrics {
        &self.metrics
    }

    /// Ingest a single upload.
    ///
    /// On error nothing from this upload is committed and no audit file is left.
    pub fn ingest(&self, path: &Path) -> Result<IngestReport> {
        let span = info_span!("ingest", path = %path.display());
        let _entered = span.enter();
        let timer = OperationTimer::new("ingest_file");

        match self.ingest_file(path) {
            Ok(report) => {
                let elapsed = timer.finish();
                self.metrics.record_file_ingested(
                    report.table,
                    report.loaded,
                    report.duplicates,
                    report.warnings.len(),
                    elapsed,
                );
                Ok(report)
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Upload rejected");
                self.metrics.record_file_failed(e.kind());
                Err(e)
            }
        }
    }

    /// Ingest uploads in order. A failure is reported for its file only;
    /// later files are still attempted.
    pub fn ingest_all<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<(PathBuf, Result<IngestReport>)> {
        paths
            .iter()
            .map(|p| {
                let path = p.as_ref();
                (path.to_path_buf(), self.ingest(path))
            })
            .collect()
    }

    fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let format = InputValidator::validate_upload_path(path)?;
        let batch = read_batch(path, format)?;
        let table = classify(&batch.columns)?;
        check_required_columns(table, &batch)?;
        info!(%table, rows = batch.len(), "Upload classified");

        let now = self.clock.now();
        let ctx = NormalizeContext {
            year: self.config.default_year.unwrap_or_else(|| now.year()),
            now,
        };

        let mut conn = self.database.get_connection()?;
        let tx = conn.transaction()?;

        let keys = collect_references(table, &batch, &ctx);
        let lookup = ReferenceResolver::new(&tx).resolve_all(&keys)?;
        let normalized = normalize(table, &batch, &lookup, &ctx)?;
        let warnings = normalized.warnings.clone();

        let audit = AuditTarget {
            directory: Path::new(&self.config.audit_directory),
            source: path,
            at: now,
        };
        let outcome = loader::load(&tx, normalized, Some(audit))?;

        if let Err(e) = tx.commit() {
            if let Some(audit_path) = &outcome.audit_path {
                if let Err(remove_err) = fs::remove_file(audit_path) {
                    warn!(path = %audit_path.display(), error = %remove_err, "Failed to remove audit file");
                }
            }
            return Err(IngestError::StoreWriteFailure { table, source: e });
        }

        info!(
            %table,
            loaded = outcome.loaded,
            duplicates = outcome.duplicates,
            existing = outcome.existing,
            references_created = lookup.created,
            warnings = warnings.len(),
            "Upload committed"
        );

        Ok(IngestReport {
            source: path.to_path_buf(),
            table,
            loaded: outcome.loaded,
            duplicates: outcome.duplicates,
            existing: outcome.existing,
            warnings,
            audit_path: outcome.audit_path,
        })
    }
}
