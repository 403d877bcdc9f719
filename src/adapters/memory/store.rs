//! In-memory ledger store
//!
//! Transactions are serializable: each one holds the table lock for its
//! whole lifetime and writes in place, keeping an undo log that is replayed
//! on rollback or drop. Current rows are indexed by natural key, and the
//! current-row uniqueness that PostgreSQL enforces with partial unique
//! indexes is checked on insert.

use crate::adapters::database::traits::{LedgerStore, LedgerTransaction};
use crate::domain::change::{ChangeLogEntry, NewChangeLogEntry};
use crate::domain::ids::{ConsumerKey, SessionId, SubstanceName};
use crate::domain::records::{
    ConsumerVersion, ManufacturerVersion, NewConsumerVersion, NewManufacturerVersion,
};
use crate::domain::session::{AnalysisSession, SessionMetadata};
use crate::domain::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Row storage; a version row's id is its position plus one
#[derive(Debug, Default)]
struct Tables {
    sessions: Vec<AnalysisSession>,
    manufacturers: Vec<ManufacturerVersion>,
    consumers: Vec<ConsumerVersion>,
    changes: Vec<ChangeLogEntry>,
    current_manufacturers: HashMap<SubstanceName, usize>,
    current_consumers: HashMap<ConsumerKey, usize>,
}

impl Tables {
    fn reindex_manufacturer(&mut self, index: usize) {
        let Some(row) = self.manufacturers.get(index) else {
            return;
        };
        if row.is_current {
            self.current_manufacturers
                .insert(row.substance_name.clone(), index);
        } else if self.current_manufacturers.get(&row.substance_name) == Some(&index) {
            self.current_manufacturers.remove(&row.substance_name);
        }
    }

    fn reindex_consumer(&mut self, index: usize) {
        let Some(row) = self.consumers.get(index) else {
            return;
        };
        if row.is_current {
            self.current_consumers.insert(row.key.clone(), index);
        } else if self.current_consumers.get(&row.key) == Some(&index) {
            self.current_consumers.remove(&row.key);
        }
    }
}

fn next_id(len: usize) -> Result<i64> {
    i64::try_from(len + 1)
        .map_err(|_| LedgerError::Database("in-memory table is full".to_string()))
}

fn row_index(id: i64, len: usize) -> Option<usize> {
    let index = usize::try_from(id.checked_sub(1)?).ok()?;
    (index < len).then_some(index)
}

/// Ledger store kept entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in the change log
    pub async fn change_count(&self) -> usize {
        self.tables.lock().await.changes.len()
    }

    /// Number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_session(&self, meta: &SessionMetadata) -> Result<SessionId> {
        let mut tables = self.tables.lock().await;
        let id = next_id(tables.sessions.len())
            .and_then(|id| SessionId::new(id).map_err(LedgerError::SessionWrite))?;
        tables
            .sessions
            .push(AnalysisSession::from_metadata(id, meta, Utc::now()));
        Ok(id)
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let tables = self.tables.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            tables,
            undo: Vec::new(),
        }))
    }

    async fn latest_session(&self) -> Result<Option<AnalysisSession>> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.iter().max_by_key(|s| s.id).cloned())
    }

    async fn change_history(
        &self,
        substance_name: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ChangeLogEntry>> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<ChangeLogEntry> = tables
            .changes
            .iter()
            .filter(|e| substance_name.map_or(true, |name| e.substance_name == name))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.changed_at.cmp(&a.changed_at).then(b.id.cmp(&a.id)));
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }

    async fn manufacturer_versions(
        &self,
        substance: &SubstanceName,
    ) -> Result<Vec<ManufacturerVersion>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .manufacturers
            .iter()
            .filter(|v| &v.substance_name == substance)
            .cloned()
            .collect();
        rows.sort_by_key(|v| v.version);
        Ok(rows)
    }

    async fn consumer_versions(&self, key: &ConsumerKey) -> Result<Vec<ConsumerVersion>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<_> = tables
            .consumers
            .iter()
            .filter(|v| &v.key == key)
            .cloned()
            .collect();
        rows.sort_by_key(|v| v.version);
        Ok(rows)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// One reversible write
#[derive(Debug)]
enum Undo {
    ManufacturerInserted,
    ManufacturerUpdated(usize, ManufacturerVersion),
    ConsumerInserted,
    ConsumerUpdated(usize, ConsumerVersion),
    ChangeAppended,
}

/// Transaction writing through the held table lock
///
/// Writes not committed are undone when the transaction is dropped.
struct MemoryTransaction {
    tables: OwnedMutexGuard<Tables>,
    undo: Vec<Undo>,
}

impl MemoryTransaction {
    fn update_manufacturer<R>(
        &mut self,
        id: i64,
        apply: impl FnOnce(&mut ManufacturerVersion) -> R,
    ) -> Result<R> {
        let tables = &mut *self.tables;
        let index = row_index(id, tables.manufacturers.len()).ok_or_else(|| {
            LedgerError::EntityWrite(format!("manufacturer version {id} not found"))
        })?;
        let Some(row) = tables.manufacturers.get_mut(index) else {
            return Err(LedgerError::EntityWrite(format!(
                "manufacturer version {id} not found"
            )));
        };
        self.undo.push(Undo::ManufacturerUpdated(index, row.clone()));
        let result = apply(row);
        tables.reindex_manufacturer(index);
        Ok(result)
    }

    fn update_consumer<R>(
        &mut self,
        id: i64,
        apply: impl FnOnce(&mut ConsumerVersion) -> R,
    ) -> Result<R> {
        let tables = &mut *self.tables;
        let index = row_index(id, tables.consumers.len())
            .ok_or_else(|| LedgerError::EntityWrite(format!("consumer version {id} not found")))?;
        let Some(row) = tables.consumers.get_mut(index) else {
            return Err(LedgerError::EntityWrite(format!(
                "consumer version {id} not found"
            )));
        };
        self.undo.push(Undo::ConsumerUpdated(index, row.clone()));
        let result = apply(row);
        tables.reindex_consumer(index);
        Ok(result)
    }

    fn revert(&mut self) {
        let tables = &mut *self.tables;
        while let Some(op) = self.undo.pop() {
            match op {
                Undo::ManufacturerInserted => {
                    if let Some(row) = tables.manufacturers.pop() {
                        let index = tables.manufacturers.len();
                        if tables.current_manufacturers.get(&row.substance_name) == Some(&index) {
                            tables.current_manufacturers.remove(&row.substance_name);
                        }
                    }
                }
                Undo::ManufacturerUpdated(index, previous) => {
                    if let Some(row) = tables.manufacturers.get_mut(index) {
                        *row = previous;
                        tables.reindex_manufacturer(index);
                    }
                }
                Undo::ConsumerInserted => {
                    if let Some(row) = tables.consumers.pop() {
                        let index = tables.consumers.len();
                        if tables.current_consumers.get(&row.key) == Some(&index) {
                            tables.current_consumers.remove(&row.key);
                        }
                    }
                }
                Undo::ConsumerUpdated(index, previous) => {
                    if let Some(row) = tables.consumers.get_mut(index) {
                        *row = previous;
                        tables.reindex_consumer(index);
                    }
                }
                Undo::ChangeAppended => {
                    tables.changes.pop();
                }
            }
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.revert();
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn current_manufacturer(
        &mut self,
        substance: &SubstanceName,
    ) -> Result<Option<ManufacturerVersion>> {
        let tables = &*self.tables;
        Ok(tables
            .current_manufacturers
            .get(substance)
            .and_then(|&index| tables.manufacturers.get(index))
            .cloned())
    }

    async fn insert_manufacturer(&mut self, row: &NewManufacturerVersion) -> Result<i64> {
        let tables = &mut *self.tables;
        if tables.current_manufacturers.contains_key(&row.substance_name) {
            return Err(LedgerError::UniquenessRace(format!(
                "current manufacturer version already exists for '{}'",
                row.substance_name
            )));
        }

        let index = tables.manufacturers.len();
        let id = next_id(index)?;
        tables.manufacturers.push(ManufacturerVersion {
            id,
            substance_name: row.substance_name.clone(),
            manufacturers: row.manufacturers.clone(),
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            version: row.version,
            is_current: true,
        });
        tables
            .current_manufacturers
            .insert(row.substance_name.clone(), index);
        self.undo.push(Undo::ManufacturerInserted);
        Ok(id)
    }

    async fn retire_manufacturer(&mut self, id: i64) -> Result<bool> {
        self.update_manufacturer(id, |row| std::mem::replace(&mut row.is_current, false))
    }

    async fn touch_manufacturer(&mut self, id: i64, seen_at: DateTime<Utc>) -> Result<()> {
        self.update_manufacturer(id, |row| row.last_seen = seen_at)
    }

    async fn reclaim_manufacturer(
        &mut self,
        substance: &SubstanceName,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = self
            .tables
            .manufacturers
            .iter()
            .filter(|v| &v.substance_name == substance)
            .max_by_key(|v| (v.is_current, v.version))
            .map(|v| v.id)
            .ok_or_else(|| {
                LedgerError::EntityWrite(format!("no manufacturer version to reclaim for '{substance}'"))
            })?;

        self.update_manufacturer(id, |row| {
            row.is_current = true;
            row.last_seen = seen_at;
        })
    }

    async fn current_consumer(&mut self, key: &ConsumerKey) -> Result<Option<ConsumerVersion>> {
        let tables = &*self.tables;
        Ok(tables
            .current_consumers
            .get(key)
            .and_then(|&index| tables.consumers.get(index))
            .cloned())
    }

    async fn insert_consumer(&mut self, row: &NewConsumerVersion) -> Result<i64> {
        let tables = &mut *self.tables;
        if tables.current_consumers.contains_key(&row.key) {
            return Err(LedgerError::UniquenessRace(format!(
                "current consumer version already exists for {}",
                row.key
            )));
        }

        let index = tables.consumers.len();
        let id = next_id(index)?;
        tables.consumers.push(ConsumerVersion {
            id,
            key: row.key.clone(),
            attributes: row.attributes.clone(),
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            version: row.version,
            is_current: true,
        });
        tables.current_consumers.insert(row.key.clone(), index);
        self.undo.push(Undo::ConsumerInserted);
        Ok(id)
    }

    async fn retire_consumer(&mut self, id: i64) -> Result<bool> {
        self.update_consumer(id, |row| std::mem::replace(&mut row.is_current, false))
    }

    async fn touch_consumer(&mut self, id: i64, seen_at: DateTime<Utc>) -> Result<()> {
        self.update_consumer(id, |row| row.last_seen = seen_at)
    }

    async fn reclaim_consumer(&mut self, key: &ConsumerKey, seen_at: DateTime<Utc>) -> Result<()> {
        let id = self
            .tables
            .consumers
            .iter()
            .filter(|v| &v.key == key)
            .max_by_key(|v| (v.is_current, v.version))
            .map(|v| v.id)
            .ok_or_else(|| {
                LedgerError::EntityWrite(format!("no consumer version to reclaim for {key}"))
            })?;

        self.update_consumer(id, |row| {
            row.is_current = true;
            row.last_seen = seen_at;
        })
    }

    async fn append_change(&mut self, entry: &NewChangeLogEntry) -> Result<i64> {
        let id = next_id(self.tables.changes.len())?;
        self.tables
            .changes
            .push(ChangeLogEntry::from_new(id, entry.clone()));
        self.undo.push(Undo::ChangeAppended);
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.undo.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.revert();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::ManufacturerSet;
    use crate::domain::session::BatchStatistics;

    fn meta() -> SessionMetadata {
        SessionMetadata {
            timestamp: Utc::now(),
            source_file: "test.xlsx".to_string(),
            statistics: BatchStatistics::default(),
        }
    }

    fn new_row(name: &str) -> NewManufacturerVersion {
        let now = Utc::now();
        NewManufacturerVersion {
            substance_name: SubstanceName::new(name).unwrap(),
            manufacturers: ManufacturerSet::from_names(["A"]),
            first_seen: now,
            last_seen: now,
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_session_ids_increase() {
        let store = MemoryStore::new();
        let first = store.insert_session(&meta()).await.unwrap();
        let second = store.insert_session(&meta()).await.unwrap();
        assert!(second > first);
        assert_eq!(store.latest_session().await.unwrap().unwrap().id, second);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_manufacturer(&new_row("X")).await.unwrap();
        tx.rollback().await.unwrap();

        let name = SubstanceName::new("X").unwrap();
        assert!(store.manufacturer_versions(&name).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_manufacturer(&new_row("X")).await.unwrap();
        }

        let name = SubstanceName::new("X").unwrap();
        assert!(store.manufacturer_versions(&name).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_current_insert_is_race() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_manufacturer(&new_row("X")).await.unwrap();
        let err = tx.insert_manufacturer(&new_row("X")).await.unwrap_err();
        assert!(err.is_uniqueness_race());

        // still usable after the race error
        tx.commit().await.unwrap();
        let name = SubstanceName::new("X").unwrap();
        assert_eq!(store.manufacturer_versions(&name).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retire_reports_stale_row() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_manufacturer(&new_row("X")).await.unwrap();
        assert!(tx.retire_manufacturer(id).await.unwrap());
        assert!(!tx.retire_manufacturer(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_rollback_restores_retired_version() {
        let store = MemoryStore::new();
        let name = SubstanceName::new("X").unwrap();

        let mut tx = store.begin().await.unwrap();
        let first = tx.insert_manufacturer(&new_row("X")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.retire_manufacturer(first).await.unwrap());
        let mut next = new_row("X");
        next.version = 2;
        next.manufacturers = ManufacturerSet::from_names(["B"]);
        tx.insert_manufacturer(&next).await.unwrap();
        tx.rollback().await.unwrap();

        let versions = store.manufacturer_versions(&name).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].is_current);

        let mut tx = store.begin().await.unwrap();
        let current = tx.current_manufacturer(&name).await.unwrap().unwrap();
        assert_eq!(current.id, first);
        assert!(tx.insert_manufacturer(&new_row("X")).await.unwrap_err().is_uniqueness_race());
    }

    #[tokio::test]
    async fn test_committed_units_keep_ids_dense() {
        let store = MemoryStore::new();
        for name in ["A", "B", "C"] {
            let mut tx = store.begin().await.unwrap();
            tx.insert_manufacturer(&new_row(name)).await.unwrap();
            if name == "B" {
                tx.rollback().await.unwrap();
            } else {
                tx.commit().await.unwrap();
            }
        }

        let c = SubstanceName::new("C").unwrap();
        assert_eq!(store.manufacturer_versions(&c).await.unwrap()[0].id, 2);
    }
}
