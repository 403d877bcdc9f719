//! Consumer version manager
//!
//! Reconciles one substance-consuming preparation, identified by its
//! natural key, against the current stored version. The four mutable
//! attributes are compared as strings; any difference yields a new version
//! and a `modified` entry naming the differing attributes.

use crate::adapters::database::{LedgerStore, LedgerTransaction};
use crate::core::versioning::changelog::ChangeLogWriter;
use crate::core::versioning::scope;
use crate::domain::ids::{ConsumerKey, SessionId};
use crate::domain::records::{ConsumerRecord, NewConsumerVersion};
use crate::domain::{LedgerError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct ConsumerVersionManager {
    store: Arc<dyn LedgerStore>,
    changelog: ChangeLogWriter,
}

impl ConsumerVersionManager {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            changelog: ChangeLogWriter::new(),
        }
    }

    /// Reconcile `record` in its own transaction
    ///
    /// Returns `true` when a version was added or modified. When a concurrent
    /// writer inserted the same key first, its row is kept current, last-seen
    /// is refreshed and `false` is returned.
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`LedgerError::EntityWrite`]; nothing from
    /// the unit is kept.
    pub async fn upsert_consumer(
        &self,
        record: &ConsumerRecord,
        session_id: SessionId,
    ) -> Result<bool> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| entity_error(&record.key, e))?;

        let outcome = self
            .reconcile(tx.as_mut(), record, session_id, Utc::now())
            .await;

        scope::finish(tx, outcome)
            .await
            .map_err(|e| entity_error(&record.key, e))
    }

    async fn reconcile(
        &self,
        tx: &mut dyn LedgerTransaction,
        record: &ConsumerRecord,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let key = &record.key;
        let incoming = &record.attributes;

        match tx.current_consumer(key).await? {
            Some(current) => {
                let changed_fields = current.attributes.diff(incoming);
                if changed_fields.is_empty() {
                    tx.touch_consumer(current.id, now).await?;
                    return Ok(false);
                }

                if !tx.retire_consumer(current.id).await? {
                    return Err(LedgerError::EntityWrite(format!(
                        "version {} of {} was modified concurrently",
                        current.version, key
                    )));
                }

                let row = NewConsumerVersion {
                    key: key.clone(),
                    attributes: incoming.clone(),
                    first_seen: current.first_seen,
                    last_seen: now,
                    version: current.version + 1,
                };
                tx.insert_consumer(&row).await?;

                tracing::debug!(
                    consumer = %key,
                    version = row.version,
                    changed_fields = ?changed_fields,
                    "Consumer attributes changed"
                );

                let entry = ChangeLogWriter::consumer_modified(
                    key,
                    &current.attributes,
                    incoming,
                    changed_fields,
                    session_id,
                    now,
                );
                self.changelog.record(tx, entry).await?;
                Ok(true)
            }
            None => {
                let row = NewConsumerVersion {
                    key: key.clone(),
                    attributes: incoming.clone(),
                    first_seen: now,
                    last_seen: now,
                    version: 1,
                };

                match tx.insert_consumer(&row).await {
                    Ok(_) => {
                        let entry =
                            ChangeLogWriter::consumer_added(key, incoming, session_id, now);
                        self.changelog.record(tx, entry).await?;
                        Ok(true)
                    }
                    Err(e) if e.is_uniqueness_race() => {
                        tx.reclaim_consumer(key, now).await?;
                        tracing::debug!(
                            consumer = %key,
                            "Concurrent first insert resolved, existing version kept"
                        );
                        Ok(false)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}

fn entity_error(key: &ConsumerKey, err: LedgerError) -> LedgerError {
    match err {
        LedgerError::EntityWrite(_) => err,
        other => LedgerError::EntityWrite(format!("consumer {key}: {other}")),
    }
}
