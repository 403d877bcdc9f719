//! Versioned entity records
//!
//! Typed forms of the two reconciled entities: substance→manufacturer
//! associations and substance-consuming preparations. Incoming records carry
//! only the natural key and the mutable payload; stored versions add the
//! version metadata.

use crate::domain::ids::{ConsumerKey, SubstanceName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of manufacturer names
///
/// Order and duplicates in the source are irrelevant; the set is kept
/// sorted so stored and logged payloads are canonical.
///
/// # Examples
///
/// ```
/// use pharmaledger::domain::records::ManufacturerSet;
///
/// let a = ManufacturerSet::from_names(["A", "B"]);
/// let b = ManufacturerSet::from_names(["B", "A", "A"]);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManufacturerSet(BTreeSet<String>);

impl ManufacturerSet {
    /// Builds a set from any iterator of names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names in canonical order
    pub fn names(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Canonical JSON array used for storage and change-log payloads
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.names())
    }
}

/// One substance and the manufacturers that supply it in the current batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerRecord {
    pub substance_name: SubstanceName,
    pub manufacturers: ManufacturerSet,
}

/// Mutable attributes of a consuming preparation
///
/// Values are kept in their normalized string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerAttributes {
    pub preparation_inn_name: String,
    pub preparation_country: String,
    pub registration_date: String,
    pub release_forms: String,
}

impl ConsumerAttributes {
    /// Names of the attributes whose values differ from `other`
    ///
    /// Comparison is exact string equality. Names come back in declaration
    /// order.
    pub fn diff(&self, other: &ConsumerAttributes) -> Vec<String> {
        let pairs = [
            (
                "preparation_inn_name",
                &self.preparation_inn_name,
                &other.preparation_inn_name,
            ),
            (
                "preparation_country",
                &self.preparation_country,
                &other.preparation_country,
            ),
            (
                "registration_date",
                &self.registration_date,
                &other.registration_date,
            ),
            ("release_forms", &self.release_forms, &other.release_forms),
        ];

        pairs
            .into_iter()
            .filter(|(_, left, right)| left != right)
            .map(|(name, _, _)| name.to_string())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "preparation_inn_name": self.preparation_inn_name,
            "preparation_country": self.preparation_country,
            "registration_date": self.registration_date,
            "release_forms": self.release_forms,
        })
    }
}

/// One consuming preparation as extracted in the current batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRecord {
    pub key: ConsumerKey,
    pub attributes: ConsumerAttributes,
}

/// Stored version of a manufacturer association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturerVersion {
    pub id: i64,
    pub substance_name: SubstanceName,
    pub manufacturers: ManufacturerSet,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub version: i32,
    pub is_current: bool,
}

/// Row to insert for a new manufacturer version
#[derive(Debug, Clone, PartialEq)]
pub struct NewManufacturerVersion {
    pub substance_name: SubstanceName,
    pub manufacturers: ManufacturerSet,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub version: i32,
}

/// Stored version of a consuming preparation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerVersion {
    pub id: i64,
    pub key: ConsumerKey,
    pub attributes: ConsumerAttributes,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub version: i32,
    pub is_current: bool,
}

/// Row to insert for a new consumer version
#[derive(Debug, Clone, PartialEq)]
pub struct NewConsumerVersion {
    pub key: ConsumerKey,
    pub attributes: ConsumerAttributes,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub version: i32,
}
