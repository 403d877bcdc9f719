//! Ingest coordinator - drives one analysis batch through the ledger
//!
//! The batch is anchored by a session row, then every manufacturer record
//! and every consumer record is reconciled as an independent unit in batch
//! order. A failed unit is rolled back, logged and skipped; only connection
//! and session failures abort the batch.

use crate::adapters::database::LedgerStore;
use crate::core::ingest::summary::IngestSummary;
use crate::core::session::SessionRecorder;
use crate::core::versioning::{ConsumerVersionManager, ManufacturerVersionManager};
use crate::domain::batch::AnalysisBatch;
use crate::domain::change::EntityKind;
use crate::domain::{LedgerError, Result};
use crate::{log_batch_progress, log_ingest_start, log_unit_failure};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Progress is logged every this many units
const PROGRESS_INTERVAL: usize = 100;

/// Ingest coordinator
pub struct IngestCoordinator {
    store: Arc<dyn LedgerStore>,
    recorder: SessionRecorder,
    manufacturers: ManufacturerVersionManager,
    consumers: ConsumerVersionManager,
    shutdown: watch::Receiver<bool>,
}

impl IngestCoordinator {
    /// Create a coordinator over `store`
    ///
    /// Once `shutdown` carries `true`, no further unit is started.
    pub fn new(store: Arc<dyn LedgerStore>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            recorder: SessionRecorder::new(store.clone()),
            manufacturers: ManufacturerVersionManager::new(store.clone()),
            consumers: ConsumerVersionManager::new(store.clone()),
            store,
            shutdown,
        }
    }

    /// Backend the coordinator writes to
    pub fn backend_name(&self) -> &str {
        self.store.backend_name()
    }

    /// Ingest a validated batch
    ///
    /// Returns the summary even when some units failed; inspect
    /// [`IngestSummary::failures`].
    ///
    /// # Errors
    ///
    /// [`LedgerError::Connection`] when the store is unreachable and
    /// [`LedgerError::SessionWrite`] when the session row cannot be written.
    /// Nothing is written in either case.
    pub async fn ingest(&self, batch: &AnalysisBatch) -> Result<IngestSummary> {
        let start_time = Instant::now();

        log_ingest_start!(
            batch.metadata.source_file,
            batch.manufacturers.len(),
            batch.consumers.len()
        );

        self.store.test_connection().await.map_err(|e| match e {
            LedgerError::Connection(_) => e,
            other => LedgerError::Connection(other.to_string()),
        })?;

        let session_id = self.recorder.create_session(&batch.metadata).await?;
        let mut summary = IngestSummary::new(session_id);
        let total = batch.unit_count();
        let mut position = 0usize;

        for (index, record) in batch.manufacturers.iter().enumerate() {
            if self.shutdown_requested() {
                summary.interrupted = true;
                break;
            }

            match self
                .manufacturers
                .upsert_manufacturer(&record.substance_name, &record.manufacturers, session_id)
                .await
            {
                Ok(changed) => summary.record_success(EntityKind::Manufacturer, changed),
                Err(e) => {
                    log_unit_failure!("manufacturer", index, record.substance_name, e);
                    summary.record_failure(
                        EntityKind::Manufacturer,
                        index,
                        record.substance_name.as_str(),
                        e.to_string(),
                    );
                }
            }

            position += 1;
            if position % PROGRESS_INTERVAL == 0 {
                log_batch_progress!(position, total);
            }
        }

        if !summary.interrupted {
            for (index, record) in batch.consumers.iter().enumerate() {
                if self.shutdown_requested() {
                    summary.interrupted = true;
                    break;
                }

                match self.consumers.upsert_consumer(record, session_id).await {
                    Ok(changed) => summary.record_success(EntityKind::Consumer, changed),
                    Err(e) => {
                        log_unit_failure!("consumer", index, record.key, e);
                        summary.record_failure(
                            EntityKind::Consumer,
                            index,
                            record.key.to_string(),
                            e.to_string(),
                        );
                    }
                }

                position += 1;
                if position % PROGRESS_INTERVAL == 0 {
                    log_batch_progress!(position, total);
                }
            }
        }

        if summary.interrupted {
            tracing::warn!(
                session_id = %session_id,
                processed = summary.total_processed(),
                total = total,
                "Shutdown requested, remaining units skipped"
            );
        }

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();

        Ok(summary)
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}
