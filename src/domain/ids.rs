//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that tie versions, sessions and
//! change-log entries together. Natural keys are compared by exact string
//! equality, so nothing here trims or case-folds the input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis session identifier
///
/// Assigned by the store when the session row is written. Always positive.
///
/// # Examples
///
/// ```
/// use pharmaledger::domain::ids::SessionId;
///
/// let id = SessionId::new(42).unwrap();
/// assert_eq!(id.get(), 42);
/// assert!(SessionId::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(i64);

impl SessionId {
    /// Creates a new SessionId
    pub fn new(id: i64) -> Result<Self, String> {
        if id <= 0 {
            return Err(format!("Session ID must be positive, got {id}"));
        }
        Ok(Self(id))
    }

    /// Returns the raw identifier
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: i64 = s
            .parse()
            .map_err(|e| format!("Invalid session ID '{s}': {e}"))?;
        Self::new(id)
    }
}

/// Substance name newtype wrapper
///
/// Natural key of a manufacturer association and the leading component of
/// a consumer key.
///
/// # Examples
///
/// ```
/// use pharmaledger::domain::ids::SubstanceName;
/// use std::str::FromStr;
///
/// let name = SubstanceName::from_str("Ибупрофен").unwrap();
/// assert_eq!(name.as_str(), "Ибупрофен");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubstanceName(String);

impl SubstanceName {
    /// Creates a new SubstanceName, rejecting blank input
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("Substance name cannot be empty".to_string());
        }
        Ok(Self(name))
    }

    /// Returns the substance name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SubstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubstanceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SubstanceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Natural key of a substance-consuming preparation
///
/// All four components are required and matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumerKey {
    pub substance_name: SubstanceName,
    pub preparation_trade_name: String,
    pub preparation_manufacturer: String,
    pub registration_number: String,
}

impl ConsumerKey {
    /// Creates a new ConsumerKey, rejecting blank components
    pub fn new(
        substance_name: SubstanceName,
        preparation_trade_name: impl Into<String>,
        preparation_manufacturer: impl Into<String>,
        registration_number: impl Into<String>,
    ) -> Result<Self, String> {
        let key = Self {
            substance_name,
            preparation_trade_name: preparation_trade_name.into(),
            preparation_manufacturer: preparation_manufacturer.into(),
            registration_number: registration_number.into(),
        };

        for (field, value) in [
            ("preparation_trade_name", &key.preparation_trade_name),
            ("preparation_manufacturer", &key.preparation_manufacturer),
            ("registration_number", &key.registration_number),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} cannot be empty"));
            }
        }

        Ok(key)
    }

    /// JSON form used as the entity reference in change-log entries
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "substance_name": self.substance_name.as_str(),
            "preparation_trade_name": self.preparation_trade_name,
            "preparation_manufacturer": self.preparation_manufacturer,
            "registration_number": self.registration_number,
        })
    }
}

impl fmt::Display for ConsumerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.substance_name,
            self.preparation_trade_name,
            self.preparation_manufacturer,
            self.registration_number
        )
    }
}
