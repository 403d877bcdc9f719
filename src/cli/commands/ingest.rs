//! Ingest command implementation
//!
//! This module implements the `ingest` command, which records one analysis
//! batch in the ledger.

use crate::adapters::database::create_ledger_store;
use crate::cli::commands::exit_code_for;
use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use crate::core::ingest::{IngestCoordinator, IngestSummary};
use crate::domain::AnalysisBatch;
use clap::Args;
use tokio::sync::watch;

/// Failures listed individually before the rest are summarized
const MAX_LISTED_FAILURES: usize = 10;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Analysis batch JSON produced by the extraction step
    #[arg(value_name = "BATCH.json")]
    pub batch: String,

    /// Run against an in-memory ledger; nothing is persisted
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 3 when any record failed
    #[arg(long)]
    pub strict: bool,
}

impl IngestArgs {
    /// Execute the ingest command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(batch = %self.batch, "Starting ingest command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let batch = match AnalysisBatch::from_path(&self.batch) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(batch = %self.batch, error = %e, "Batch rejected");
                eprintln!("Invalid batch {}: {e}", self.batch);
                return Ok(2); // Validation error exit code
            }
        };

        if self.dry_run || config.application.dry_run {
            tracing::info!("Dry run mode enabled - using in-memory ledger");
            println!("🔍 DRY RUN MODE - No data will be written to the database");
            println!();
            config.database_target = DatabaseTarget::Memory;
        }

        let store = match create_ledger_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open ledger store");
                eprintln!("Failed to open ledger: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!(
            "🚀 Ingesting {} ({} manufacturer, {} consumer records)...",
            batch.metadata.source_file,
            batch.manufacturers.len(),
            batch.consumers.len()
        );
        println!();

        let coordinator = IngestCoordinator::new(store.clone(), shutdown_signal);
        let outcome = coordinator.ingest(&batch).await;
        store.close().await;

        let summary = match outcome {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Ingest failed");
                eprintln!("Ingest failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        print_summary(&summary);
        Ok(self.exit_code(&summary))
    }

    fn exit_code(&self, summary: &IngestSummary) -> i32 {
        if summary.interrupted {
            println!("⚠️  Ingest interrupted. Committed records are kept.");
            println!("   Run the same command again to finish the batch.");
            tracing::info!("Ingest interrupted by user signal");
            130 // SIGINT exit code (standard Unix convention)
        } else if summary.failures.is_empty() {
            println!("✅ Ingest completed successfully!");
            0
        } else if self.strict {
            println!("❌ Ingest completed with failures (strict mode)");
            3
        } else {
            println!("⚠️  Ingest completed with failures");
            0
        }
    }
}

fn print_summary(summary: &IngestSummary) {
    println!("📊 Ingest Summary:");
    println!("  Session ID: {}", summary.session_id);
    println!("  Changed Records: {}", summary.changed_count);
    println!(
        "  Manufacturers: {} processed, {} changed, {} unchanged, {} failed",
        summary.manufacturers.processed,
        summary.manufacturers.changed,
        summary.manufacturers.unchanged,
        summary.manufacturers.failed
    );
    println!(
        "  Consumers: {} processed, {} changed, {} unchanged, {} failed",
        summary.consumers.processed,
        summary.consumers.changed,
        summary.consumers.unchanged,
        summary.consumers.failed
    );
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.failures.is_empty() {
        println!("⚠️  Failed records:");
        for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            println!(
                "  - {} #{} {}: {}",
                failure.entity_kind, failure.index, failure.entity, failure.message
            );
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            println!(
                "  ... and {} more failures",
                summary.failures.len() - MAX_LISTED_FAILURES
            );
        }
        println!();
    }
}
