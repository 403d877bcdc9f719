//! Row mappings for the PostgreSQL ledger tables
//!
//! Column lists are kept next to the conversions so `SELECT`s and the
//! `from_row` helpers can't drift apart.

use crate::domain::change::{ChangeLogEntry, ChangeType, EntityKind};
use crate::domain::ids::{ConsumerKey, SessionId, SubstanceName};
use crate::domain::records::{
    ConsumerAttributes, ConsumerVersion, ManufacturerSet, ManufacturerVersion,
};
use crate::domain::session::AnalysisSession;
use crate::domain::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;

pub const SESSION_COLUMNS: &str = "id, timestamp, source_file, total_records, substances_found, \
     preparations_found, consumers_found, created_at";

pub const MANUFACTURER_COLUMNS: &str =
    "id, substance_name, manufacturers, first_seen, last_seen, version, is_current";

pub const CONSUMER_COLUMNS: &str = "id, substance_name, preparation_trade_name, \
     preparation_manufacturer, registration_number, preparation_inn_name, preparation_country, \
     registration_date, release_forms, first_seen, last_seen, version, is_current";

pub const CHANGE_COLUMNS: &str = "id, entity_kind, substance_name, entity_key, change_type, \
     old_payload, new_payload, changed_fields, session_id, changed_at";

fn column<'a, T>(row: &'a Row, name: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name)
        .map_err(|e| LedgerError::Database(format!("Failed to read column '{name}': {e}")))
}

fn corrupt(table: &str, detail: String) -> LedgerError {
    LedgerError::Database(format!("Invalid row in {table}: {detail}"))
}

/// Convert an `analysis_sessions` row
pub fn session_from_row(row: &Row) -> Result<AnalysisSession> {
    let id: i64 = column(row, "id")?;
    Ok(AnalysisSession {
        id: SessionId::new(id).map_err(|e| corrupt("analysis_sessions", e))?,
        timestamp: column(row, "timestamp")?,
        source_file: column(row, "source_file")?,
        total_records: column(row, "total_records")?,
        substances_found: column(row, "substances_found")?,
        preparations_found: column(row, "preparations_found")?,
        consumers_found: column(row, "consumers_found")?,
        created_at: column(row, "created_at")?,
    })
}

/// Convert a `substance_manufacturers` row
pub fn manufacturer_from_row(row: &Row) -> Result<ManufacturerVersion> {
    let name: String = column(row, "substance_name")?;
    let manufacturers: Value = column(row, "manufacturers")?;
    let manufacturers: ManufacturerSet = serde_json::from_value(manufacturers)
        .map_err(|e| corrupt("substance_manufacturers", e.to_string()))?;

    Ok(ManufacturerVersion {
        id: column(row, "id")?,
        substance_name: SubstanceName::new(name)
            .map_err(|e| corrupt("substance_manufacturers", e))?,
        manufacturers,
        first_seen: column::<DateTime<Utc>>(row, "first_seen")?,
        last_seen: column::<DateTime<Utc>>(row, "last_seen")?,
        version: column(row, "version")?,
        is_current: column(row, "is_current")?,
    })
}

/// Convert a `substance_consumers` row
pub fn consumer_from_row(row: &Row) -> Result<ConsumerVersion> {
    let substance = SubstanceName::new(column::<String>(row, "substance_name")?)
        .map_err(|e| corrupt("substance_consumers", e))?;
    let key = ConsumerKey::new(
        substance,
        column::<String>(row, "preparation_trade_name")?,
        column::<String>(row, "preparation_manufacturer")?,
        column::<String>(row, "registration_number")?,
    )
    .map_err(|e| corrupt("substance_consumers", e))?;

    Ok(ConsumerVersion {
        id: column(row, "id")?,
        key,
        attributes: ConsumerAttributes {
            preparation_inn_name: column(row, "preparation_inn_name")?,
            preparation_country: column(row, "preparation_country")?,
            registration_date: column(row, "registration_date")?,
            release_forms: column(row, "release_forms")?,
        },
        first_seen: column(row, "first_seen")?,
        last_seen: column(row, "last_seen")?,
        version: column(row, "version")?,
        is_current: column(row, "is_current")?,
    })
}

/// Convert a `change_log` row
pub fn change_from_row(row: &Row) -> Result<ChangeLogEntry> {
    let entity_kind: String = column(row, "entity_kind")?;
    let change_type: String = column(row, "change_type")?;
    let session_id: i64 = column(row, "session_id")?;

    Ok(ChangeLogEntry {
        id: column(row, "id")?,
        entity_kind: entity_kind
            .parse::<EntityKind>()
            .map_err(|e| corrupt("change_log", e))?,
        substance_name: column(row, "substance_name")?,
        entity_key: column(row, "entity_key")?,
        change_type: change_type
            .parse::<ChangeType>()
            .map_err(|e| corrupt("change_log", e))?,
        old_payload: column(row, "old_payload")?,
        new_payload: column(row, "new_payload")?,
        changed_fields: column(row, "changed_fields")?,
        session_id: SessionId::new(session_id).map_err(|e| corrupt("change_log", e))?,
        changed_at: column(row, "changed_at")?,
    })
}
