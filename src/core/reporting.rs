//! Read-only reporting queries over the ledger

use crate::adapters::database::LedgerStore;
use crate::domain::change::ChangeLogEntry;
use crate::domain::session::AnalysisSession;
use crate::domain::{LedgerError, Result};
use std::sync::Arc;

/// Entries returned when no limit is given
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Largest accepted history limit
pub const MAX_HISTORY_LIMIT: i64 = 1000;

pub struct Reporter {
    store: Arc<dyn LedgerStore>,
}

impl Reporter {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Most recently created session, if any
    pub async fn get_latest_session(&self) -> Result<Option<AnalysisSession>> {
        self.store.latest_session().await
    }

    /// Change-log entries ordered by `changed_at` then id, newest first
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] if `limit` is outside `1..=1000`.
    pub async fn get_change_history(
        &self,
        substance_name: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<ChangeLogEntry>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(LedgerError::Validation(format!(
                "history limit must be between 1 and {MAX_HISTORY_LIMIT}, got {limit}"
            )));
        }

        self.store.change_history(substance_name, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::ErrorKind;

    #[tokio::test]
    async fn test_empty_ledger() {
        let reporter = Reporter::new(Arc::new(MemoryStore::new()));
        assert!(reporter.get_latest_session().await.unwrap().is_none());
        assert!(reporter.get_change_history(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_limit_bounds() {
        let reporter = Reporter::new(Arc::new(MemoryStore::new()));
        for bad in [0, -5, 1001] {
            let err = reporter.get_change_history(None, Some(bad)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(reporter.get_change_history(None, Some(1000)).await.is_ok());
    }
}
