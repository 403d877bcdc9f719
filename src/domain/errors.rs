//! Domain error types
//!
//! This module defines the closed error hierarchy for PharmaLedger.
//! All errors are domain-specific and don't expose third-party types, so
//! callers branch on [`ErrorKind`] rather than on message text.

use thiserror::Error;

/// Main PharmaLedger error type
///
/// The first four variants are the reconciliation error kinds. The rest are
/// ambient failures from configuration, batch validation and I/O.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store cannot be reached at all
    #[error("Connection error: {0}")]
    Connection(String),

    /// The analysis session row could not be created
    #[error("Session write error: {0}")]
    SessionWrite(String),

    /// Processing of a single manufacturer or consumer record failed
    #[error("Entity write error: {0}")]
    EntityWrite(String),

    /// A concurrent writer inserted the same natural key first
    #[error("Uniqueness race: {0}")]
    UniquenessRace(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed batch or invalid query arguments
    #[error("Validation error: {0}")]
    Validation(String),

    /// Read-path query failures
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Field-less discriminant of [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    SessionWrite,
    EntityWrite,
    UniquenessRace,
    Configuration,
    Validation,
    Database,
    Serialization,
    Io,
}

impl LedgerError {
    /// Returns the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Connection(_) => ErrorKind::Connection,
            LedgerError::SessionWrite(_) => ErrorKind::SessionWrite,
            LedgerError::EntityWrite(_) => ErrorKind::EntityWrite,
            LedgerError::UniquenessRace(_) => ErrorKind::UniquenessRace,
            LedgerError::Configuration(_) => ErrorKind::Configuration,
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::Database(_) => ErrorKind::Database,
            LedgerError::Serialization(_) => ErrorKind::Serialization,
            LedgerError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this error aborts a whole batch
    ///
    /// Connection and session failures are fatal because no audit entry can
    /// be attributed without a session. Entity failures only skip one record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::Connection(_) | LedgerError::SessionWrite(_)
        )
    }

    /// Whether this error is the benign first-insert race
    pub fn is_uniqueness_race(&self) -> bool {
        matches!(self, LedgerError::UniquenessRace(_))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            LedgerError::Connection("down".into()).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            LedgerError::SessionWrite("x".into()).kind(),
            ErrorKind::SessionWrite
        );
        assert_eq!(
            LedgerError::EntityWrite("x".into()).kind(),
            ErrorKind::EntityWrite
        );
        assert_eq!(
            LedgerError::UniquenessRace("x".into()).kind(),
            ErrorKind::UniquenessRace
        );
    }

    #[test]
    fn test_fatal_errors() {
        assert!(LedgerError::Connection("down".into()).is_fatal());
        assert!(LedgerError::SessionWrite("insert failed".into()).is_fatal());
        assert!(!LedgerError::EntityWrite("row".into()).is_fatal());
        assert!(!LedgerError::UniquenessRace("key".into()).is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: LedgerError = io_err.into();
        assert!(matches!(err, LedgerError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: LedgerError = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: LedgerError = toml_err.into();
        assert!(matches!(err, LedgerError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_ledger_error_implements_std_error() {
        let err = LedgerError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
