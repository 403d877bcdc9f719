//! Core business logic for PharmaLedger.
//!
//! # Modules
//!
//! - [`ingest`] - Batch orchestration and summaries
//! - [`session`] - Analysis session anchoring
//! - [`versioning`] - Per-entity version reconciliation and the change log
//! - [`reporting`] - Latest session and change history queries
//! - [`retention`] - File cleanup for extracted and downloaded data
//!
//! # Ingest Workflow
//!
//! 1. **Check**: Verify the store is reachable
//! 2. **Anchor**: Commit one analysis session row
//! 3. **Reconcile**: Each manufacturer, then each consumer record, in its own transaction
//! 4. **Report**: Summarize changed, unchanged and failed units
//!
//! # Example
//!
//! ```rust,no_run
//! use pharmaledger::adapters::memory::MemoryStore;
//! use pharmaledger::core::ingest::IngestCoordinator;
//! use pharmaledger::domain::AnalysisBatch;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let batch = AnalysisBatch::from_path("analysis.json")?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let coordinator = IngestCoordinator::new(Arc::new(MemoryStore::new()), shutdown_rx);
//!
//! let summary = coordinator.ingest(&batch).await?;
//! println!("Session: {}", summary.session_id);
//! println!("Changed: {}", summary.changed_count);
//! println!("Failed: {}", summary.total_failed());
//! # Ok(())
//! # }
//! ```

pub mod ingest;
pub mod reporting;
pub mod retention;
pub mod session;
pub mod versioning;
