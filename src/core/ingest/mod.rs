//! Batch ingestion
//!
//! [`IngestCoordinator`] runs a validated [`AnalysisBatch`](crate::domain::AnalysisBatch)
//! through session creation and per-record reconciliation, producing an
//! [`IngestSummary`].

pub mod coordinator;
pub mod summary;

pub use coordinator::IngestCoordinator;
pub use summary::{IngestSummary, UnitFailure, UnitTally};
