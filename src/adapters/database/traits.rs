//! Database abstraction traits
//!
//! This module defines the traits that ledger backends must implement.
//! Session writes are autocommitted on their own; every entity update runs
//! inside a [`LedgerTransaction`] obtained from [`LedgerStore::begin`].

use crate::domain::change::{ChangeLogEntry, NewChangeLogEntry};
use crate::domain::ids::{ConsumerKey, SessionId, SubstanceName};
use crate::domain::records::{
    ConsumerVersion, ManufacturerVersion, NewConsumerVersion, NewManufacturerVersion,
};
use crate::domain::session::{AnalysisSession, SessionMetadata};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Ledger store trait
///
/// Implemented by every backend (PostgreSQL, in-memory). All handles are
/// shared across the units of one batch.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Test the store connection
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Connection`](crate::domain::LedgerError::Connection)
    /// if the store cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Create tables and indexes if they don't exist
    async fn ensure_schema(&self) -> Result<()>;

    /// Write a session row and commit it immediately
    async fn insert_session(&self, meta: &SessionMetadata) -> Result<SessionId>;

    /// Start a transaction for one unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>>;

    /// Most recently created session, if any
    async fn latest_session(&self) -> Result<Option<AnalysisSession>>;

    /// Change-log entries, most recent first
    ///
    /// # Arguments
    ///
    /// * `substance_name` - Only entries for this substance when set
    /// * `limit` - Maximum number of entries
    async fn change_history(
        &self,
        substance_name: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ChangeLogEntry>>;

    /// All stored versions of a manufacturer association, oldest first
    async fn manufacturer_versions(&self, substance: &SubstanceName)
        -> Result<Vec<ManufacturerVersion>>;

    /// All stored versions of a consumer, oldest first
    async fn consumer_versions(&self, key: &ConsumerKey) -> Result<Vec<ConsumerVersion>>;

    /// Release pooled resources
    async fn close(&self) {}

    /// Human-readable backend name
    fn backend_name(&self) -> &str;
}

/// One open transaction against the ledger
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its writes on every backend.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Current version of a manufacturer association
    async fn current_manufacturer(
        &mut self,
        substance: &SubstanceName,
    ) -> Result<Option<ManufacturerVersion>>;

    /// Insert a manufacturer version marked current
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UniquenessRace`](crate::domain::LedgerError::UniquenessRace)
    /// when another current row for the substance exists. The transaction
    /// stays usable after that error.
    async fn insert_manufacturer(&mut self, row: &NewManufacturerVersion) -> Result<i64>;

    /// Flip a manufacturer version to non-current
    ///
    /// Returns `false` if the row was no longer current.
    async fn retire_manufacturer(&mut self, id: i64) -> Result<bool>;

    /// Refresh last-seen on a manufacturer version
    async fn touch_manufacturer(&mut self, id: i64, seen_at: DateTime<Utc>) -> Result<()>;

    /// Force the latest version of a substance current and refresh last-seen
    async fn reclaim_manufacturer(
        &mut self,
        substance: &SubstanceName,
        seen_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Current version of a consumer
    async fn current_consumer(&mut self, key: &ConsumerKey) -> Result<Option<ConsumerVersion>>;

    /// Insert a consumer version marked current
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UniquenessRace`](crate::domain::LedgerError::UniquenessRace)
    /// when another current row for the key exists. The transaction stays
    /// usable after that error.
    async fn insert_consumer(&mut self, row: &NewConsumerVersion) -> Result<i64>;

    /// Flip a consumer version to non-current
    ///
    /// Returns `false` if the row was no longer current.
    async fn retire_consumer(&mut self, id: i64) -> Result<bool>;

    /// Refresh last-seen on a consumer version
    async fn touch_consumer(&mut self, id: i64, seen_at: DateTime<Utc>) -> Result<()>;

    /// Force the latest version of a key current and refresh last-seen
    async fn reclaim_consumer(&mut self, key: &ConsumerKey, seen_at: DateTime<Utc>)
        -> Result<()>;

    /// Append a change-log entry
    async fn append_change(&mut self, entry: &NewChangeLogEntry) -> Result<i64>;

    /// Commit all writes
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard all writes
    async fn rollback(self: Box<Self>) -> Result<()>;
}
