//! PostgreSQL ledger store
//!
//! Implements [`LedgerStore`] and [`LedgerTransaction`] on top of
//! [`PostgreSQLClient`]. A transaction keeps one pooled connection checked
//! out from `BEGIN` until commit or rollback.

use crate::adapters::database::traits::{LedgerStore, LedgerTransaction};
use crate::adapters::postgresql::client::{describe_error, PostgreSQLClient};
use crate::adapters::postgresql::models::{
    change_from_row, consumer_from_row, manufacturer_from_row, session_from_row, CHANGE_COLUMNS,
    CONSUMER_COLUMNS, MANUFACTURER_COLUMNS, SESSION_COLUMNS,
};
use crate::domain::change::{ChangeLogEntry, NewChangeLogEntry};
use crate::domain::ids::{ConsumerKey, SessionId, SubstanceName};
use crate::domain::records::{
    ConsumerVersion, ManufacturerVersion, NewConsumerVersion, NewManufacturerVersion,
};
use crate::domain::session::{AnalysisSession, SessionMetadata};
use crate::domain::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Object;
use std::sync::Arc;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;

/// PostgreSQL implementation of [`LedgerStore`]
pub struct PostgreSQLStore {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLStore {
    /// Create a new PostgreSQL store
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

fn query_error(context: &str, e: tokio_postgres::Error) -> LedgerError {
    LedgerError::Database(format!("{context}: {}", describe_error(&e)))
}

#[async_trait]
impl LedgerStore for PostgreSQLStore {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.apply_migrations().await
    }

    async fn insert_session(&self, meta: &SessionMetadata) -> Result<SessionId> {
        let conn = self.client.get_connection().await?;
        let stats = &meta.statistics;

        let row = conn
            .query_one(
                "INSERT INTO analysis_sessions (
                    timestamp, source_file, total_records, substances_found,
                    preparations_found, consumers_found
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id",
                &[
                    &meta.timestamp,
                    &meta.source_file,
                    &stats.total_records,
                    &stats.substances_found,
                    &stats.preparations_found,
                    &stats.substance_consumers_found,
                ],
            )
            .await
            .map_err(|e| {
                LedgerError::SessionWrite(format!("Failed to insert session: {}", describe_error(&e)))
            })?;

        let id: i64 = row
            .try_get(0)
            .map_err(|e| LedgerError::SessionWrite(format!("Failed to read session id: {e}")))?;
        SessionId::new(id).map_err(LedgerError::SessionWrite)
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>> {
        let conn = self.client.get_connection().await?;

        if let Err(e) = conn
            .batch_execute(&format!(
                "BEGIN; SET LOCAL statement_timeout = {}",
                self.client.statement_timeout_ms()
            ))
            .await
        {
            // BEGIN may have succeeded; never recycle a half-open transaction
            drop(Object::take(conn));
            return Err(query_error("Failed to begin transaction", e));
        }

        Ok(Box::new(PostgreSQLTransaction { conn: Some(conn) }))
    }

    async fn latest_session(&self) -> Result<Option<AnalysisSession>> {
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_opt(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM analysis_sessions
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                &[],
            )
            .await
            .map_err(|e| query_error("Failed to query latest session", e))?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn change_history(
        &self,
        substance_name: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ChangeLogEntry>> {
        let conn = self.client.get_connection().await?;
        let rows = match substance_name {
            Some(name) => {
                conn.query(
                    &format!(
                        "SELECT {CHANGE_COLUMNS} FROM change_log
                         WHERE substance_name = $1
                         ORDER BY changed_at DESC, id DESC LIMIT $2"
                    ),
                    &[&name, &limit],
                )
                .await
            }
            None => {
                conn.query(
                    &format!(
                        "SELECT {CHANGE_COLUMNS} FROM change_log
                         ORDER BY changed_at DESC, id DESC LIMIT $1"
                    ),
                    &[&limit],
                )
                .await
            }
        }
        .map_err(|e| query_error("Failed to query change history", e))?;

        rows.iter().map(change_from_row).collect()
    }

    async fn manufacturer_versions(
        &self,
        substance: &SubstanceName,
    ) -> Result<Vec<ManufacturerVersion>> {
        let conn = self.client.get_connection().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {MANUFACTURER_COLUMNS} FROM substance_manufacturers
                     WHERE substance_name = $1 ORDER BY version"
                ),
                &[&substance.as_str()],
            )
            .await
            .map_err(|e| query_error("Failed to query manufacturer versions", e))?;

        rows.iter().map(manufacturer_from_row).collect()
    }

    async fn consumer_versions(&self, key: &ConsumerKey) -> Result<Vec<ConsumerVersion>> {
        let conn = self.client.get_connection().await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {CONSUMER_COLUMNS} FROM substance_consumers
                     WHERE substance_name = $1 AND preparation_trade_name = $2
                       AND preparation_manufacturer = $3 AND registration_number = $4
                     ORDER BY version"
                ),
                &[
                    &key.substance_name.as_str(),
                    &key.preparation_trade_name,
                    &key.preparation_manufacturer,
                    &key.registration_number,
                ],
            )
            .await
            .map_err(|e| query_error("Failed to query consumer versions", e))?;

        rows.iter().map(consumer_from_row).collect()
    }

    async fn close(&self) {
        self.client.close();
    }

    fn backend_name(&self) -> &str {
        "postgresql"
    }
}

/// One unit-of-work transaction on a checked-out connection
///
/// Dropping it unfinished detaches the connection from the pool so the
/// server rolls the transaction back when the socket closes.
pub struct PostgreSQLTransaction {
    conn: Option<Object>,
}

impl PostgreSQLTransaction {
    fn conn(&self) -> Result<&Object> {
        self.conn
            .as_ref()
            .ok_or_else(|| LedgerError::Database("Transaction already finished".to_string()))
    }

    /// Run an `INSERT ... RETURNING id` under a savepoint
    ///
    /// A violation of a version-row constraint is rolled back to the savepoint and
    /// reported as [`LedgerError::UniquenessRace`], leaving the transaction
    /// usable.
    async fn guarded_insert(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        entity: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.batch_execute("SAVEPOINT version_insert")
            .await
            .map_err(|e| query_error("Failed to create savepoint", e))?;

        match conn.query_one(sql, params).await {
            Ok(row) => {
                conn.batch_execute("RELEASE SAVEPOINT version_insert")
                    .await
                    .map_err(|e| query_error("Failed to release savepoint", e))?;
                row.try_get(0)
                    .map_err(|e| LedgerError::Database(format!("Failed to read inserted id: {e}")))
            }
            Err(e) if is_current_row_violation(&e) => {
                conn.batch_execute("ROLLBACK TO SAVEPOINT version_insert")
                    .await
                    .map_err(|e| query_error("Failed to roll back to savepoint", e))?;
                Err(LedgerError::UniquenessRace(format!(
                    "current version already exists for {entity}"
                )))
            }
            Err(e) => Err(query_error(&format!("Failed to insert version for {entity}"), e)),
        }
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        self.conn()?
            .execute(sql, params)
            .await
            .map_err(|e| query_error("Statement execution failed", e))
    }
}

fn is_current_row_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
        && is_version_constraint(err.as_db_error().and_then(|db| db.constraint()))
}

/// Whether a unique violation came from one of the version-row constraints
///
/// A duplicate first insert can trip either the `(key, version)` constraint
/// or the partial `WHERE is_current` index; PostgreSQL reports whichever
/// index it checks first.
fn is_version_constraint(constraint: Option<&str>) -> bool {
    constraint.map_or(true, |name| {
        name.ends_with("_current") || name.ends_with("_version")
    })
}

impl Drop for PostgreSQLTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!("Transaction dropped without commit, discarding connection");
            drop(Object::take(conn));
        }
    }
}

#[async_trait]
impl LedgerTransaction for PostgreSQLTransaction {
    async fn current_manufacturer(
        &mut self,
        substance: &SubstanceName,
    ) -> Result<Option<ManufacturerVersion>> {
        let row = self
            .conn()?
            .query_opt(
                &format!(
                    "SELECT {MANUFACTURER_COLUMNS} FROM substance_manufacturers
                     WHERE substance_name = $1 AND is_current"
                ),
                &[&substance.as_str()],
            )
            .await
            .map_err(|e| query_error("Failed to look up current manufacturer version", e))?;

        row.as_ref().map(manufacturer_from_row).transpose()
    }

    async fn insert_manufacturer(&mut self, row: &NewManufacturerVersion) -> Result<i64> {
        let manufacturers = row.manufacturers.to_json();
        self.guarded_insert(
            "INSERT INTO substance_manufacturers (
                substance_name, manufacturers, first_seen, last_seen, version, is_current
            )
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING id",
            &[
                &row.substance_name.as_str(),
                &manufacturers,
                &row.first_seen,
                &row.last_seen,
                &row.version,
            ],
            &format!("substance '{}'", row.substance_name),
        )
        .await
    }

    async fn retire_manufacturer(&mut self, id: i64) -> Result<bool> {
        let updated = self
            .execute(
                "UPDATE substance_manufacturers SET is_current = FALSE
                 WHERE id = $1 AND is_current",
                &[&id],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn touch_manufacturer(&mut self, id: i64, seen_at: DateTime<Utc>) -> Result<()> {
        self.execute(
            "UPDATE substance_manufacturers SET last_seen = $2 WHERE id = $1",
            &[&id, &seen_at],
        )
        .await?;
        Ok(())
    }

    async fn reclaim_manufacturer(
        &mut self,
        substance: &SubstanceName,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        let updated = self
            .execute(
                "UPDATE substance_manufacturers SET is_current = TRUE, last_seen = $2
                 WHERE id = (
                     SELECT id FROM substance_manufacturers
                     WHERE substance_name = $1
                     ORDER BY is_current DESC, version DESC
                     LIMIT 1
                 )",
                &[&substance.as_str(), &seen_at],
            )
            .await?;

        if updated == 0 {
            return Err(LedgerError::EntityWrite(format!(
                "no manufacturer version to reclaim for '{substance}'"
            )));
        }
        Ok(())
    }

    async fn current_consumer(&mut self, key: &ConsumerKey) -> Result<Option<ConsumerVersion>> {
        let row = self
            .conn()?
            .query_opt(
                &format!(
                    "SELECT {CONSUMER_COLUMNS} FROM substance_consumers
                     WHERE substance_name = $1 AND preparation_trade_name = $2
                       AND preparation_manufacturer = $3 AND registration_number = $4
                       AND is_current"
                ),
                &[
                    &key.substance_name.as_str(),
                    &key.preparation_trade_name,
                    &key.preparation_manufacturer,
                    &key.registration_number,
                ],
            )
            .await
            .map_err(|e| query_error("Failed to look up current consumer version", e))?;

        row.as_ref().map(consumer_from_row).transpose()
    }

    async fn insert_consumer(&mut self, row: &NewConsumerVersion) -> Result<i64> {
        let key = &row.key;
        let attrs = &row.attributes;
        self.guarded_insert(
            "INSERT INTO substance_consumers (
                substance_name, preparation_trade_name, preparation_manufacturer,
                registration_number, preparation_inn_name, preparation_country,
                registration_date, release_forms, first_seen, last_seen, version, is_current
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE)
            RETURNING id",
            &[
                &key.substance_name.as_str(),
                &key.preparation_trade_name,
                &key.preparation_manufacturer,
                &key.registration_number,
                &attrs.preparation_inn_name,
                &attrs.preparation_country,
                &attrs.registration_date,
                &attrs.release_forms,
                &row.first_seen,
                &row.last_seen,
                &row.version,
            ],
            &format!("consumer {key}"),
        )
        .await
    }

    async fn retire_consumer(&mut self, id: i64) -> Result<bool> {
        let updated = self
            .execute(
                "UPDATE substance_consumers SET is_current = FALSE
                 WHERE id = $1 AND is_current",
                &[&id],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn touch_consumer(&mut self, id: i64, seen_at: DateTime<Utc>) -> Result<()> {
        self.execute(
            "UPDATE substance_consumers SET last_seen = $2 WHERE id = $1",
            &[&id, &seen_at],
        )
        .await?;
        Ok(())
    }

    async fn reclaim_consumer(&mut self, key: &ConsumerKey, seen_at: DateTime<Utc>) -> Result<()> {
        let updated = self
            .execute(
                "UPDATE substance_consumers SET is_current = TRUE, last_seen = $5
                 WHERE id = (
                     SELECT id FROM substance_consumers
                     WHERE substance_name = $1 AND preparation_trade_name = $2
                       AND preparation_manufacturer = $3 AND registration_number = $4
                     ORDER BY is_current DESC, version DESC
                     LIMIT 1
                 )",
                &[
                    &key.substance_name.as_str(),
                    &key.preparation_trade_name,
                    &key.preparation_manufacturer,
                    &key.registration_number,
                    &seen_at,
                ],
            )
            .await?;

        if updated == 0 {
            return Err(LedgerError::EntityWrite(format!(
                "no consumer version to reclaim for {key}"
            )));
        }
        Ok(())
    }

    async fn append_change(&mut self, entry: &NewChangeLogEntry) -> Result<i64> {
        let row = self
            .conn()?
            .query_one(
                "INSERT INTO change_log (
                    entity_kind, substance_name, entity_key, change_type, old_payload,
                    new_payload, changed_fields, session_id, changed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id",
                &[
                    &entry.entity_kind.as_str(),
                    &entry.substance_name,
                    &entry.entity_key,
                    &entry.change_type.as_str(),
                    &entry.old_payload,
                    &entry.new_payload,
                    &entry.changed_fields,
                    &entry.session_id.get(),
                    &entry.changed_at,
                ],
            )
            .await
            .map_err(|e| query_error("Failed to append change-log entry", e))?;

        row.try_get(0)
            .map_err(|e| LedgerError::Database(format!("Failed to read change-log id: {e}")))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        let conn = this.conn.take().ok_or_else(|| {
            LedgerError::Database("Transaction already finished".to_string())
        })?;

        match conn.batch_execute("COMMIT").await {
            Ok(()) => Ok(()),
            Err(e) => {
                drop(Object::take(conn));
                Err(query_error("Failed to commit transaction", e))
            }
        }
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        let conn = this.conn.take().ok_or_else(|| {
            LedgerError::Database("Transaction already finished".to_string())
        })?;

        match conn.batch_execute("ROLLBACK").await {
            Ok(()) => Ok(()),
            Err(e) => {
                drop(Object::take(conn));
                Err(query_error("Failed to roll back transaction", e))
            }
        }
    }
}
