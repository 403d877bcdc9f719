//! Session recorder
//!
//! Writes the batch anchor row before any entity work starts.

use crate::adapters::database::LedgerStore;
use crate::domain::ids::SessionId;
use crate::domain::session::SessionMetadata;
use crate::domain::{LedgerError, Result};
use std::sync::Arc;

/// Creates one durable session row per batch
pub struct SessionRecorder {
    store: Arc<dyn LedgerStore>,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Insert and commit the session row
    ///
    /// The write is committed on its own, so the session stays visible even
    /// if every later unit fails.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Connection`] if the store is unreachable, otherwise
    /// [`LedgerError::SessionWrite`]. Both are fatal for the batch.
    pub async fn create_session(&self, meta: &SessionMetadata) -> Result<SessionId> {
        let session_id = self
            .store
            .insert_session(meta)
            .await
            .map_err(|e| match e {
                LedgerError::Connection(_) | LedgerError::SessionWrite(_) => e,
                other => LedgerError::SessionWrite(other.to_string()),
            })?;

        tracing::info!(
            session_id = %session_id,
            source_file = %meta.source_file,
            total_records = meta.statistics.total_records,
            "Analysis session created"
        );

        Ok(session_id)
    }
}
