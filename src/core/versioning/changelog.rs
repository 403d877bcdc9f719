//! Change log writer
//!
//! Builds audit entries and appends them through the caller's transaction,
//! so an entry commits or rolls back together with the version write that
//! caused it.

use crate::adapters::database::LedgerTransaction;
use crate::domain::change::{ChangeType, EntityKind, NewChangeLogEntry};
use crate::domain::ids::{ConsumerKey, SessionId, SubstanceName};
use crate::domain::records::{ConsumerAttributes, ManufacturerSet};
use crate::domain::Result;
use chrono::{DateTime, Utc};
use serde_json::json;

/// Changed-field name used for manufacturer set modifications
pub const MANUFACTURERS_FIELD: &str = "manufacturers";

/// Appends change-log entries inside an open transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeLogWriter;

impl ChangeLogWriter {
    pub fn new() -> Self {
        Self
    }

    /// Append `entry` within `tx`
    pub async fn record(
        &self,
        tx: &mut dyn LedgerTransaction,
        entry: NewChangeLogEntry,
    ) -> Result<i64> {
        let id = tx.append_change(&entry).await?;
        tracing::debug!(
            change_id = id,
            entity_kind = %entry.entity_kind,
            change_type = %entry.change_type,
            substance_name = %entry.substance_name,
            session_id = %entry.session_id,
            "Change recorded"
        );
        Ok(id)
    }

    /// Entry for a substance seen for the first time
    pub fn manufacturer_added(
        substance: &SubstanceName,
        manufacturers: &ManufacturerSet,
        session_id: SessionId,
        changed_at: DateTime<Utc>,
    ) -> NewChangeLogEntry {
        NewChangeLogEntry {
            entity_kind: EntityKind::Manufacturer,
            substance_name: substance.as_str().to_string(),
            entity_key: json!({ "substance_name": substance.as_str() }),
            change_type: ChangeType::Added,
            old_payload: None,
            new_payload: manufacturers.to_json(),
            changed_fields: Vec::new(),
            session_id,
            changed_at,
        }
    }

    /// Entry for a changed manufacturer set
    pub fn manufacturer_modified(
        substance: &SubstanceName,
        old: &ManufacturerSet,
        new: &ManufacturerSet,
        session_id: SessionId,
        changed_at: DateTime<Utc>,
    ) -> NewChangeLogEntry {
        NewChangeLogEntry {
            entity_kind: EntityKind::Manufacturer,
            substance_name: substance.as_str().to_string(),
            entity_key: json!({ "substance_name": substance.as_str() }),
            change_type: ChangeType::Modified,
            old_payload: Some(old.to_json()),
            new_payload: new.to_json(),
            changed_fields: vec![MANUFACTURERS_FIELD.to_string()],
            session_id,
            changed_at,
        }
    }

    /// Entry for a preparation seen for the first time
    pub fn consumer_added(
        key: &ConsumerKey,
        attributes: &ConsumerAttributes,
        session_id: SessionId,
        changed_at: DateTime<Utc>,
    ) -> NewChangeLogEntry {
        NewChangeLogEntry {
            entity_kind: EntityKind::Consumer,
            substance_name: key.substance_name.as_str().to_string(),
            entity_key: key.to_json(),
            change_type: ChangeType::Added,
            old_payload: None,
            new_payload: attributes.to_json(),
            changed_fields: Vec::new(),
            session_id,
            changed_at,
        }
    }

    /// Entry for changed preparation attributes
    pub fn consumer_modified(
        key: &ConsumerKey,
        old: &ConsumerAttributes,
        new: &ConsumerAttributes,
        changed_fields: Vec<String>,
        session_id: SessionId,
        changed_at: DateTime<Utc>,
    ) -> NewChangeLogEntry {
        NewChangeLogEntry {
            entity_kind: EntityKind::Consumer,
            substance_name: key.substance_name.as_str().to_string(),
            entity_key: key.to_json(),
            change_type: ChangeType::Modified,
            old_payload: Some(old.to_json()),
            new_payload: new.to_json(),
            changed_fields,
            session_id,
            changed_at,
        }
    }
}
