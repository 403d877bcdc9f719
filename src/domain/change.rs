//! Change-log entry model
//!
//! Entries are append-only. They reference the affected entity by natural
//! key and the session only for attribution.

use crate::domain::ids::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Kind of detected change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(ChangeType::Added),
            "modified" => Ok(ChangeType::Modified),
            other => Err(format!("Unknown change type '{other}'")),
        }
    }
}

/// Which versioned table an entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Manufacturer,
    Consumer,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Manufacturer => "manufacturer",
            EntityKind::Consumer => "consumer",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manufacturer" => Ok(EntityKind::Manufacturer),
            "consumer" => Ok(EntityKind::Consumer),
            other => Err(format!("Unknown entity kind '{other}'")),
        }
    }
}

/// Entry to append; the store assigns `id`
#[derive(Debug, Clone, PartialEq)]
pub struct NewChangeLogEntry {
    pub entity_kind: EntityKind,
    /// Denormalized for history filtering
    pub substance_name: String,
    /// Natural key of the affected entity
    pub entity_key: Value,
    pub change_type: ChangeType,
    pub old_payload: Option<Value>,
    pub new_payload: Value,
    pub changed_fields: Vec<String>,
    pub session_id: SessionId,
    pub changed_at: DateTime<Utc>,
}

/// Stored change-log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: i64,
    pub entity_kind: EntityKind,
    pub substance_name: String,
    pub entity_key: Value,
    pub change_type: ChangeType,
    pub old_payload: Option<Value>,
    pub new_payload: Value,
    pub changed_fields: Vec<String>,
    pub session_id: SessionId,
    pub changed_at: DateTime<Utc>,
}

impl ChangeLogEntry {
    pub fn from_new(id: i64, entry: NewChangeLogEntry) -> Self {
        Self {
            id,
            entity_kind: entry.entity_kind,
            substance_name: entry.substance_name,
            entity_key: entry.entity_key,
            change_type: entry.change_type,
            old_payload: entry.old_payload,
            new_payload: entry.new_payload,
            changed_fields: entry.changed_fields,
            session_id: entry.session_id,
            changed_at: entry.changed_at,
        }
    }
}
