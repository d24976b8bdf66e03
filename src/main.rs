use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use forensic_ingest::config::AppConfig;
use forensic_ingest::logging::init_logging;
use forensic_ingest::{Database, IngestionService, LogicalTable, RecordRepository};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load one or more .csv/.xlsx dumps into the store
    Ingest {
        /// Files to ingest, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print every row of a table
    List {
        /// Table name, e.g. calls or sms_messages
        table: LogicalTable,
    },
    /// Search a table's text columns
    Search {
        /// Table name
        table: LogicalTable,
        /// Substring to look for
        term: String,
    },
    /// List chat partners with their latest message
    Chats,
    /// Show the chat with one partner
    Chat {
        /// Sender name
        name: String,
    },
    /// Show text messages exchanged with one party
    Sms {
        /// Value of the from/to column
        name: String,
    },
}

/// Per-file line printed by `ingest`
#[derive(Serialize)]
struct FileOutcome<'a> {
    file: &'a std::path::Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a forensic_ingest::IngestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

fn main() -> Result<ExitCode> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging; the guard must outlive the run
    let log_file = config.logging.file_path.as_deref().map(std::path::Path::new);
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        log_file,
        config.logging.format == "json",
    )?;

    info!("Starting forensic-ingest");

    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize database with configuration
    let mut db_config = config.database.clone();
    db_config.url = config.get_database_url();
    let db = Database::from_config(&db_config).context("Failed to open database")?;

    match cli.command {
        Commands::Ingest { files } => ingest(&config, db, &files),
        Commands::List { table } => {
            print_json(&repository(&config, db).list(table)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Search { table, term } => {
            print_json(&repository(&config, db).search(table, &term)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Chats => {
            print_json(&repository(&config, db).chat_threads()?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Chat { name } => {
            print_json(&repository(&config, db).chat_conversation(&name)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sms { name } => {
            print_json(&repository(&config, db).sms_conversation(&name)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn repository(config: &AppConfig, db: Database) -> RecordRepository {
    RecordRepository::new(db, config.ingest.search_limit)
}

/// Ingest every file, printing one JSON line each; fails the exit code if any file failed
fn ingest(config: &AppConfig, db: Database, files: &[PathBuf]) -> Result<ExitCode> {
    let service = IngestionService::new(db, config.ingest.clone());
    let mut stdout = io::stdout().lock();
    let mut failed = 0usize;

    for (file, result) in service.ingest_all(files) {
        let outcome = match &result {
            Ok(report) => FileOutcome {
                file: &file,
                report: Some(report),
                error: None,
                kind: None,
            },
            Err(e) => {
                failed += 1;
                error!(file = %file.display(), error = %e, "Ingest failed");
                FileOutcome {
                    file: &file,
                    report: None,
                    error: Some(e.to_string()),
                    kind: Some(e.kind()),
                }
            }
        };
        serde_json::to_writer(&mut stdout, &outcome)?;
        writeln!(stdout)?;
    }

    let snapshot = service.metrics().snapshot();
    info!(
        files_ingested = snapshot.files_ingested,
        files_failed = snapshot.files_failed,
        rows_loaded = snapshot.rows_loaded,
        duplicates_dropped = snapshot.duplicates_dropped,
        row_warnings = snapshot.row_warnings,
        "Ingest run finished"
    );

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
