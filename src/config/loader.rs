//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{PharmaLedgerConfig, PostgreSQLConfig};
use super::secret::secret_string;
use crate::domain::errors::LedgerError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`PharmaLedgerConfig`]
/// 4. Applies `DATABASE_URL` and `PHARMALEDGER_*` overrides
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`LedgerError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, the TOML is malformed, or
/// validation fails.
///
/// # Examples
///
/// ```no_run
/// use pharmaledger::config::load_config;
///
/// let config = load_config("pharmaledger.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PharmaLedgerConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(LedgerError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        LedgerError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text the same way [`load_config`] does
pub fn parse_config(contents: &str) -> Result<PharmaLedgerConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PharmaLedgerConfig = toml::from_str(&contents)
        .map_err(|e| LedgerError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        LedgerError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| LedgerError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(LedgerError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies overrides from the process environment
///
/// `DATABASE_URL` replaces the PostgreSQL connection string (creating the
/// section with defaults when absent). Variables of the form
/// `PHARMALEDGER_<SECTION>_<KEY>` are applied afterwards and win.
fn apply_env_overrides(config: &mut PharmaLedgerConfig) -> Result<()> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides<F>(config: &mut PharmaLedgerConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let parse_error = |key: &str, val: &str| {
        LedgerError::Configuration(format!("Invalid value '{val}' for {key}"))
    };

    let connection_override = lookup("PHARMALEDGER_POSTGRESQL_CONNECTION_STRING")
        .or_else(|| lookup("DATABASE_URL"));
    if let Some(val) = connection_override {
        match config.postgresql {
            Some(ref mut pg) => pg.connection_string = secret_string(val),
            None => {
                config.postgresql = Some(PostgreSQLConfig::from_connection_string(
                    secret_string(val),
                ))
            }
        }
    }

    if let Some(val) = lookup("PHARMALEDGER_DATABASE_TARGET") {
        config.database_target = val
            .parse()
            .map_err(LedgerError::Configuration)?;
    }

    // Application overrides
    if let Some(val) = lookup("PHARMALEDGER_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = lookup("PHARMALEDGER_APPLICATION_DRY_RUN") {
        config.application.dry_run = val
            .parse()
            .map_err(|_| parse_error("PHARMALEDGER_APPLICATION_DRY_RUN", &val))?;
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Some(val) = lookup("PHARMALEDGER_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = val
                .parse()
                .map_err(|_| parse_error("PHARMALEDGER_POSTGRESQL_MAX_CONNECTIONS", &val))?;
        }
        if let Some(val) = lookup("PHARMALEDGER_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS") {
            pg.statement_timeout_seconds = val.parse().map_err(|_| {
                parse_error("PHARMALEDGER_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS", &val)
            })?;
        }
        if let Some(val) = lookup("PHARMALEDGER_POSTGRESQL_SSL_MODE") {
            pg.ssl_mode = val;
        }
    }

    // Ingest overrides
    if let Some(val) = lookup("PHARMALEDGER_INGEST_HISTORY_LIMIT") {
        config.ingest.history_limit = val
            .parse()
            .map_err(|_| parse_error("PHARMALEDGER_INGEST_HISTORY_LIMIT", &val))?;
    }

    // Retention overrides
    if let Some(val) = lookup("PHARMALEDGER_RETENTION_ENABLED") {
        config.retention.enabled = val
            .parse()
            .map_err(|_| parse_error("PHARMALEDGER_RETENTION_ENABLED", &val))?;
    }
    if let Some(val) = lookup("PHARMALEDGER_RETENTION_RETENTION_DAYS") {
        config.retention.retention_days = val
            .parse()
            .map_err(|_| parse_error("PHARMALEDGER_RETENTION_RETENTION_DAYS", &val))?;
    }
    if let Some(val) = lookup("PHARMALEDGER_RETENTION_DIRECTORIES") {
        config.retention.directories = val
            .split(',')
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(String::from)
            .collect();
    }

    // Logging overrides
    if let Some(val) = lookup("PHARMALEDGER_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val
            .parse()
            .map_err(|_| parse_error("PHARMALEDGER_LOGGING_LOCAL_ENABLED", &val))?;
    }
    if let Some(val) = lookup("PHARMALEDGER_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DatabaseTarget;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("PL_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${PL_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("PL_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let input = "password = \"${PL_LOADER_SURELY_MISSING}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("PL_LOADER_SURELY_MISSING"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# connection_string = \"${PL_LOADER_COMMENTED_OUT}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-pharmaledger.toml");
        assert!(matches!(result, Err(LedgerError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
database_target = "memory"

[application]
log_level = "debug"

[retention]
directories = ["./data"]
retention_days = 14
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.database_target, DatabaseTarget::Memory);
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.retention.retention_days, 14);
        assert_eq!(config.retention.keep_latest_archives, 3);
        assert_eq!(config.ingest.history_limit, 50);
    }

    #[test]
    fn test_parse_config_rejects_unknown_target() {
        let result = parse_config("database_target = \"mysql\"\n");
        assert!(matches!(result, Err(LedgerError::Configuration(_))));
    }

    #[test]
    fn test_database_url_creates_postgresql_section() {
        let mut config = PharmaLedgerConfig::in_memory();
        apply_overrides(
            &mut config,
            lookup_from(&[
                ("DATABASE_URL", "postgresql://u:p@db:5432/ledger"),
                ("PHARMALEDGER_DATABASE_TARGET", "postgresql"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database_target, DatabaseTarget::PostgreSQL);
        let pg = config.postgresql.as_ref().unwrap();
        assert_eq!(
            pg.connection_string.expose_secret().as_str(),
            "postgresql://u:p@db:5432/ledger"
        );
        assert_eq!(pg.max_connections, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prefixed_connection_string_beats_database_url() {
        let mut config = PharmaLedgerConfig::in_memory();
        apply_overrides(
            &mut config,
            lookup_from(&[
                ("DATABASE_URL", "postgresql://generic/db"),
                (
                    "PHARMALEDGER_POSTGRESQL_CONNECTION_STRING",
                    "postgresql://specific/db",
                ),
            ]),
        )
        .unwrap();

        let pg = config.postgresql.unwrap();
        assert_eq!(
            pg.connection_string.expose_secret().as_str(),
            "postgresql://specific/db"
        );
    }

    #[test]
    fn test_retention_overrides() {
        let mut config = PharmaLedgerConfig::in_memory();
        apply_overrides(
            &mut config,
            lookup_from(&[
                ("PHARMALEDGER_RETENTION_DIRECTORIES", "/a, /b,,"),
                ("PHARMALEDGER_RETENTION_RETENTION_DAYS", "7"),
            ]),
        )
        .unwrap();

        assert_eq!(config.retention.directories, vec!["/a", "/b"]);
        assert_eq!(config.retention.retention_days, 7);
    }

    #[test]
    fn test_invalid_override_value_is_rejected() {
        let mut config = PharmaLedgerConfig::in_memory();
        let result = apply_overrides(
            &mut config,
            lookup_from(&[("PHARMALEDGER_INGEST_HISTORY_LIMIT", "many")]),
        );
        assert!(matches!(result, Err(LedgerError::Configuration(_))));
    }
}
