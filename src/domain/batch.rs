//! Batch boundary: loosely-typed input and its validated form
//!
//! The extraction step hands over a JSON document whose values are only
//! loosely typed (dates may arrive as numbers, attributes as `null`). It is
//! deserialized into [`RawAnalysisBatch`] and converted by
//! [`AnalysisBatch::from_raw`] into typed records before any store I/O, so
//! malformed input is rejected with a message naming the offending field.

use crate::domain::errors::LedgerError;
use crate::domain::ids::{ConsumerKey, SubstanceName};
use crate::domain::records::{
    ConsumerAttributes, ConsumerRecord, ManufacturerRecord, ManufacturerSet,
};
use crate::domain::session::{BatchStatistics, SessionMetadata};
use crate::domain::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Batch as produced by the extraction step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnalysisBatch {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub source_file: Option<Value>,
    #[serde(default)]
    pub statistics: Option<Map<String, Value>>,
    #[serde(default)]
    pub substances_manufacturers: Option<Vec<Value>>,
    #[serde(default)]
    pub substance_consumers: Option<Vec<Value>>,
}

/// Validated batch ready for reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisBatch {
    pub metadata: SessionMetadata,
    pub manufacturers: Vec<ManufacturerRecord>,
    pub consumers: Vec<ConsumerRecord>,
}

impl AnalysisBatch {
    /// Parses and validates a batch from JSON text
    pub fn from_json_str(input: &str) -> Result<Self> {
        let raw: RawAnalysisBatch = serde_json::from_str(input)?;
        Self::from_raw(raw)
    }

    /// Reads, parses and validates a batch file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Io(format!("Failed to read batch file {}: {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    /// Validates a raw batch and converts it into typed records
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] naming the list, index and field
    /// of the first malformed value.
    pub fn from_raw(raw: RawAnalysisBatch) -> Result<Self> {
        let timestamp = parse_timestamp(required(raw.timestamp.as_ref(), "timestamp")?)?;
        let source_file = required_string(raw.source_file.as_ref(), "source_file")?;
        let statistics = parse_statistics(
            raw.statistics
                .as_ref()
                .ok_or_else(|| invalid("statistics is required"))?,
        )?;

        let manufacturers = raw
            .substances_manufacturers
            .ok_or_else(|| invalid("substances_manufacturers is required"))?
            .iter()
            .enumerate()
            .map(|(index, value)| parse_manufacturer(index, value))
            .collect::<Result<Vec<_>>>()?;

        let consumers = raw
            .substance_consumers
            .ok_or_else(|| invalid("substance_consumers is required"))?
            .iter()
            .enumerate()
            .map(|(index, value)| parse_consumer(index, value))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            metadata: SessionMetadata {
                timestamp,
                source_file,
                statistics,
            },
            manufacturers,
            consumers,
        })
    }

    /// Total number of reconciliation units in the batch
    pub fn unit_count(&self) -> usize {
        self.manufacturers.len() + self.consumers.len()
    }
}

fn invalid(message: impl Into<String>) -> LedgerError {
    LedgerError::Validation(message.into())
}

fn required<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a Value> {
    match value {
        Some(Value::Null) | None => Err(invalid(format!("{field} is required"))),
        Some(v) => Ok(v),
    }
}

fn required_string(value: Option<&Value>, field: &str) -> Result<String> {
    let value = required(value, field)?;
    let text = scalar_to_string(value)
        .ok_or_else(|| invalid(format!("{field} must be a string, got {value}")))?;
    if text.trim().is_empty() {
        return Err(invalid(format!("{field} cannot be empty")));
    }
    Ok(text)
}

/// Normalizes a scalar JSON value to its string form
///
/// Strings are taken verbatim, numbers and booleans use their JSON text.
/// Arrays, objects and null have no string form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid(format!("timestamp must be a string, got {value}")))?;

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(invalid(format!(
        "timestamp '{text}' is not an ISO-8601 date-time"
    )))
}

fn parse_statistics(stats: &Map<String, Value>) -> Result<BatchStatistics> {
    let count = |field: &str| -> Result<i64> {
        let value = required(stats.get(field), &format!("statistics.{field}"))?;
        match value.as_i64() {
            Some(n) if n >= 0 => Ok(n),
            _ => Err(invalid(format!(
                "statistics.{field} must be a non-negative integer, got {value}"
            ))),
        }
    };

    Ok(BatchStatistics {
        total_records: count("total_records")?,
        substances_found: count("substances_found")?,
        preparations_found: count("preparations_found")?,
        substance_consumers_found: count("substance_consumers_found")?,
    })
}

fn as_object<'a>(value: &'a Value, location: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| invalid(format!("{location} must be an object")))
}

fn parse_manufacturer(index: usize, value: &Value) -> Result<ManufacturerRecord> {
    let location = format!("substances_manufacturers[{index}]");
    let object = as_object(value, &location)?;

    let name = required_string(
        object.get("substance_name"),
        &format!("{location}.substance_name"),
    )?;
    let substance_name =
        SubstanceName::new(name).map_err(|e| invalid(format!("{location}: {e}")))?;

    let list = required(
        object.get("manufacturers"),
        &format!("{location}.manufacturers"),
    )?
    .as_array()
    .ok_or_else(|| invalid(format!("{location}.manufacturers must be an array")))?;

    let names = list
        .iter()
        .enumerate()
        .map(|(i, item)| {
            scalar_to_string(item).ok_or_else(|| {
                invalid(format!(
                    "{location}.manufacturers[{i}] must be a string, got {item}"
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ManufacturerRecord {
        substance_name,
        manufacturers: ManufacturerSet::from_names(names),
    })
}

fn parse_consumer(index: usize, value: &Value) -> Result<ConsumerRecord> {
    let location = format!("substance_consumers[{index}]");
    let object = as_object(value, &location)?;

    let key_field =
        |field: &str| required_string(object.get(field), &format!("{location}.{field}"));

    let substance_name = SubstanceName::new(key_field("substance_name")?)
        .map_err(|e| invalid(format!("{location}: {e}")))?;
    let key = ConsumerKey::new(
        substance_name,
        key_field("preparation_trade_name")?,
        key_field("preparation_manufacturer")?,
        key_field("registration_number")?,
    )
    .map_err(|e| invalid(format!("{location}: {e}")))?;

    let attribute = |field: &str| -> Result<String> {
        match object.get(field) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(v) => scalar_to_string(v).ok_or_else(|| {
                invalid(format!("{location}.{field} must be a scalar value, got {v}"))
            }),
        }
    };

    Ok(ConsumerRecord {
        key,
        attributes: ConsumerAttributes {
            preparation_inn_name: attribute("preparation_inn_name")?,
            preparation_country: attribute("preparation_country")?,
            registration_date: attribute("registration_date")?,
            release_forms: attribute("release_forms")?,
        },
    })
}
