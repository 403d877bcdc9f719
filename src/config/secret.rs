//! Secret handling for credentials held in configuration
//!
//! The PostgreSQL connection string carries a password, so it is kept in a
//! `secrecy::Secret` which redacts `Debug` output and zeroes memory on drop.
//!
//! # Example
//!
//! ```rust
//! use pharmaledger::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let dsn = secret_string("postgresql://ledger:pw@db/ledger".to_string());
//! assert!(dsn.expose_secret().starts_with("postgresql://"));
//! assert!(!format!("{dsn:?}").contains("pw"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload stored inside a [`SecretString`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Borrow the raw value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the secret value starts with a prefix
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parse the secret value into another type
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Redacted, zeroize-on-drop string
pub type SecretString = Secret<SecretValue>;

/// Wrap a plain string in a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Replace the user-info part of a connection URL with `***`
///
/// ```rust
/// use pharmaledger::config::redact_connection_string;
///
/// assert_eq!(
///     redact_connection_string("postgresql://user:pw@db:5432/ledger"),
///     "postgresql://***@db:5432/ledger"
/// );
/// ```
pub fn redact_connection_string(connection_string: &str) -> String {
    let (scheme, rest) = connection_string
        .split_once("://")
        .unwrap_or(("postgresql", connection_string));

    match rest.rsplit_once('@') {
        Some((_, host)) => format!("{scheme}://***@{host}"),
        None => format!("{scheme}://{rest}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("postgresql://localhost/ledger".to_string());
        assert_eq!(secret.expose_secret().as_str(), "postgresql://localhost/ledger");
        assert!(secret.expose_secret().starts_with("postgresql://"));
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("hunter2".to_string());
        let debug_output = format!("{secret:?}");

        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("REDACTED") || debug_output.contains("Secret"));
    }

    #[test]
    fn test_secret_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Section {
            connection_string: SecretString,
        }

        let section: Section =
            toml::from_str(r#"connection_string = "postgres://a:b@h/db""#).unwrap();
        assert_eq!(
            section.connection_string.expose_secret().as_str(),
            "postgres://a:b@h/db"
        );
    }

    #[test]
    fn test_redact_connection_string() {
        assert_eq!(
            redact_connection_string("postgres://a:b@c@host/db"),
            "postgres://***@host/db"
        );
        assert_eq!(
            redact_connection_string("postgresql://host/db"),
            "postgresql://host/db"
        );
    }
}
