// PharmaLedger - Versioned pharmaceutical registry ledger
// Copyright (c) 2025 PharmaLedger Contributors
// Licensed under the MIT License

//! # PharmaLedger - versioned substance registry ledger
//!
//! PharmaLedger records which manufacturers produce each pharmaceutical
//! substance and which registered preparations consume it, keeping every
//! historical version and an append-only change log.
//!
//! ## Overview
//!
//! Each ingested batch:
//! - **Anchors** an analysis session row, committed on its own
//! - **Reconciles** each manufacturer and consumer record in its own transaction
//! - **Versions** entities: unchanged records only refresh last-seen, changed
//!   records retire the current version and insert the next one
//! - **Logs** every `added` and `modified` change against the session
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Ingestion, versioning, reporting and retention
//! - [`adapters`] - Ledger stores (PostgreSQL, in-memory)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pharmaledger::adapters::database::create_ledger_store;
//! use pharmaledger::config::load_config;
//! use pharmaledger::core::ingest::IngestCoordinator;
//! use pharmaledger::domain::AnalysisBatch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("pharmaledger.toml")?;
//!     let store = create_ledger_store(&config).await?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let coordinator = IngestCoordinator::new(store, shutdown_rx);
//!
//!     let batch = AnalysisBatch::from_path("analysis.json")?;
//!     let summary = coordinator.ingest(&batch).await?;
//!
//!     println!("Session {} changed {} records", summary.session_id, summary.changed_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::LedgerError`]. Connection and
//! session failures abort a batch; a failure inside one record is reported
//! as [`domain::LedgerError::EntityWrite`] and only skips that record.
//!
//! ```rust,no_run
//! use pharmaledger::domain::LedgerError;
//!
//! fn example() -> Result<(), LedgerError> {
//!     let config = pharmaledger::config::load_config("pharmaledger.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
