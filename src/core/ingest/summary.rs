//! Ingest summary and reporting
//!
//! This module defines structures for tracking the outcome of one batch.

use crate::domain::change::EntityKind;
use crate::domain::ids::SessionId;
use std::time::Duration;

/// Per-kind unit counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitTally {
    /// Units attempted
    pub processed: usize,

    /// Units that added or modified a version
    pub changed: usize,

    /// Units whose current version was only refreshed
    pub unchanged: usize,

    /// Units rolled back after an error
    pub failed: usize,
}

/// A unit that was rolled back and skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    /// Which kind of record failed
    pub entity_kind: EntityKind,

    /// Position of the record in its batch list
    pub index: usize,

    /// Natural key of the record, for display
    pub entity: String,

    /// Error message
    pub message: String,
}

/// Summary of one ingestion run
#[derive(Debug, Clone)]
pub struct IngestSummary {
    /// Session the run was attributed to
    pub session_id: SessionId,

    /// Records that produced an added or modified version
    pub changed_count: usize,

    /// Manufacturer unit counters
    pub manufacturers: UnitTally,

    /// Consumer unit counters
    pub consumers: UnitTally,

    /// Failed units in processing order
    pub failures: Vec<UnitFailure>,

    /// Wall-clock duration
    pub duration: Duration,

    /// A shutdown signal stopped the run before every unit was scheduled
    pub interrupted: bool,
}

impl IngestSummary {
    /// Create an empty summary for a session
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            changed_count: 0,
            manufacturers: UnitTally::default(),
            consumers: UnitTally::default(),
            failures: Vec::new(),
            duration: Duration::ZERO,
            interrupted: false,
        }
    }

    fn tally_mut(&mut self, kind: EntityKind) -> &mut UnitTally {
        match kind {
            EntityKind::Manufacturer => &mut self.manufacturers,
            EntityKind::Consumer => &mut self.consumers,
        }
    }

    /// Record a committed unit
    pub fn record_success(&mut self, kind: EntityKind, changed: bool) {
        let tally = self.tally_mut(kind);
        tally.processed += 1;
        if changed {
            tally.changed += 1;
            self.changed_count += 1;
        } else {
            tally.unchanged += 1;
        }
    }

    /// Record a rolled-back unit
    pub fn record_failure(
        &mut self,
        kind: EntityKind,
        index: usize,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) {
        let tally = self.tally_mut(kind);
        tally.processed += 1;
        tally.failed += 1;
        self.failures.push(UnitFailure {
            entity_kind: kind,
            index,
            entity: entity.into(),
            message: message.into(),
        });
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Units attempted across both kinds
    pub fn total_processed(&self) -> usize {
        self.manufacturers.processed + self.consumers.processed
    }

    /// Units that failed across both kinds
    pub fn total_failed(&self) -> usize {
        self.manufacturers.failed + self.consumers.failed
    }

    /// Every unit was scheduled and none failed
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.failures.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            session_id = %self.session_id,
            changed_count = self.changed_count,
            manufacturers_processed = self.manufacturers.processed,
            manufacturers_changed = self.manufacturers.changed,
            manufacturers_failed = self.manufacturers.failed,
            consumers_processed = self.consumers.processed,
            consumers_changed = self.consumers.changed,
            consumers_failed = self.consumers.failed,
            duration_ms = self.duration.as_millis() as u64,
            interrupted = self.interrupted,
            "Ingestion completed"
        );

        if !self.failures.is_empty() {
            tracing::warn!(
                failure_count = self.failures.len(),
                "Ingestion completed with failed units"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut summary = IngestSummary::new(SessionId::new(3).unwrap());
        summary.record_success(EntityKind::Manufacturer, true);
        summary.record_success(EntityKind::Manufacturer, false);
        summary.record_success(EntityKind::Consumer, true);
        summary.record_failure(EntityKind::Consumer, 1, "key", "boom");

        assert_eq!(summary.changed_count, 2);
        assert_eq!(summary.manufacturers.unchanged, 1);
        assert_eq!(summary.consumers.processed, 2);
        assert_eq!(summary.consumers.failed, 1);
        assert_eq!(summary.total_processed(), 4);
        assert_eq!(summary.total_failed(), 1);
        assert_eq!(summary.failures[0].index, 1);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_empty_summary_is_complete() {
        let summary = IngestSummary::new(SessionId::new(1).unwrap())
            .with_duration(Duration::from_millis(5));
        assert!(summary.is_complete());
        assert_eq!(summary.duration, Duration::from_millis(5));
    }
}
