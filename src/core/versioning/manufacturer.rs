//! Manufacturer version manager
//!
//! Reconciles one substance's manufacturer set against its current version.
//! Sets are compared with set equality, so order and duplicates never
//! produce a new version.

use crate::adapters::database::{LedgerStore, LedgerTransaction};
use crate::core::versioning::changelog::ChangeLogWriter;
use crate::core::versioning::scope;
use crate::domain::ids::{SessionId, SubstanceName};
use crate::domain::records::{ManufacturerSet, NewManufacturerVersion};
use crate::domain::{LedgerError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct ManufacturerVersionManager {
    store: Arc<dyn LedgerStore>,
    changelog: ChangeLogWriter,
}

impl ManufacturerVersionManager {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            changelog: ChangeLogWriter::new(),
        }
    }

    /// Reconcile `manufacturers` for `substance` in its own transaction
    ///
    /// Returns `true` when a version was added or modified. A benign race on
    /// the first insert resolves to `false` without a log entry.
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`LedgerError::EntityWrite`]; nothing from
    /// the unit is kept.
    pub async fn upsert_manufacturer(
        &self,
        substance: &SubstanceName,
        manufacturers: &ManufacturerSet,
        session_id: SessionId,
    ) -> Result<bool> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| entity_error(substance, e))?;

        let outcome = self
            .reconcile(tx.as_mut(), substance, manufacturers, session_id, Utc::now())
            .await;

        scope::finish(tx, outcome)
            .await
            .map_err(|e| entity_error(substance, e))
    }

    async fn reconcile(
        &self,
        tx: &mut dyn LedgerTransaction,
        substance: &SubstanceName,
        incoming: &ManufacturerSet,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(current) = tx.current_manufacturer(substance).await? else {
            let row = NewManufacturerVersion {
                substance_name: substance.clone(),
                manufacturers: incoming.clone(),
                first_seen: now,
                last_seen: now,
                version: 1,
            };

            return match tx.insert_manufacturer(&row).await {
                Ok(_) => {
                    let entry =
                        ChangeLogWriter::manufacturer_added(substance, incoming, session_id, now);
                    self.changelog.record(tx, entry).await?;
                    Ok(true)
                }
                Err(e) if e.is_uniqueness_race() => {
                    tx.reclaim_manufacturer(substance, now).await?;
                    tracing::debug!(
                        substance_name = %substance,
                        "Concurrent first insert resolved, existing version kept"
                    );
                    Ok(false)
                }
                Err(e) => Err(e),
            };
        };

        if current.manufacturers == *incoming {
            tx.touch_manufacturer(current.id, now).await?;
            return Ok(false);
        }

        if !tx.retire_manufacturer(current.id).await? {
            return Err(LedgerError::EntityWrite(format!(
                "version {} of '{}' was modified concurrently",
                current.version, substance
            )));
        }

        let row = NewManufacturerVersion {
            substance_name: substance.clone(),
            manufacturers: incoming.clone(),
            first_seen: current.first_seen,
            last_seen: now,
            version: current.version + 1,
        };
        tx.insert_manufacturer(&row).await?;

        let entry = ChangeLogWriter::manufacturer_modified(
            substance,
            &current.manufacturers,
            incoming,
            session_id,
            now,
        );
        self.changelog.record(tx, entry).await?;

        tracing::debug!(
            substance_name = %substance,
            version = row.version,
            "Manufacturer set changed"
        );
        Ok(true)
    }
}

fn entity_error(substance: &SubstanceName, err: LedgerError) -> LedgerError {
    match err {
        LedgerError::EntityWrite(_) => err,
        other => LedgerError::EntityWrite(format!("manufacturer '{substance}': {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, ManufacturerVersionManager, SessionId) {
        let store = Arc::new(MemoryStore::new());
        let manager = ManufacturerVersionManager::new(store.clone());
        (store, manager, SessionId::new(1).unwrap())
    }

    #[tokio::test]
    async fn test_first_sighting_creates_version_one() {
        let (store, manager, session) = setup().await;
        let substance = SubstanceName::new("Ибупрофен").unwrap();

        let changed = manager
            .upsert_manufacturer(&substance, &ManufacturerSet::from_names(["A", "B"]), session)
            .await
            .unwrap();
        assert!(changed);

        let versions = store.manufacturer_versions(&substance).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, 1);
        assert!(versions[0].is_current);
        assert_eq!(versions[0].first_seen, versions[0].last_seen);
    }

    #[tokio::test]
    async fn test_changed_set_keeps_first_seen() {
        let (store, manager, session) = setup().await;
        let substance = SubstanceName::new("Ибупрофен").unwrap();

        manager
            .upsert_manufacturer(&substance, &ManufacturerSet::from_names(["A"]), session)
            .await
            .unwrap();
        manager
            .upsert_manufacturer(&substance, &ManufacturerSet::from_names(["C"]), session)
            .await
            .unwrap();

        let versions = store.manufacturer_versions(&substance).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert!(!versions[0].is_current);
        assert!(versions[1].is_current);
        assert_eq!(versions[1].version, 2);
        assert_eq!(versions[1].first_seen, versions[0].first_seen);
    }

    #[test]
    fn test_entity_error_wraps_once() {
        let substance = SubstanceName::new("X").unwrap();
        let wrapped = entity_error(&substance, LedgerError::Database("down".to_string()));
        assert!(matches!(wrapped, LedgerError::EntityWrite(ref m) if m.contains("'X'")));

        let kept = entity_error(&substance, LedgerError::EntityWrite("as is".to_string()));
        assert!(matches!(kept, LedgerError::EntityWrite(ref m) if m == "as is"));
    }
}
