//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold `ENV_MUTEX` so they do not
//! interfere with each other.

use pharmaledger::config::load_config;
use pharmaledger::config::schema::DatabaseTarget;
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("PHARMALEDGER_APPLICATION_LOG_LEVEL");
    std::env::remove_var("PHARMALEDGER_DATABASE_TARGET");
    std::env::remove_var("PHARMALEDGER_INGEST_HISTORY_LIMIT");
    std::env::remove_var("PHARMALEDGER_RETENTION_RETENTION_DAYS");
    std::env::remove_var("PHARMALEDGER_POSTGRESQL_CONNECTION_STRING");
    std::env::remove_var("DATABASE_URL");
    std::env::remove_var("TEST_PL_PG_PASSWORD");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_PL_PG_PASSWORD", "s3cret");

    let file = write_config(
        r#"
database_target = "postgresql"

[application]
log_level = "debug"
dry_run = true

[postgresql]
connection_string = "postgresql://ledger:${TEST_PL_PG_PASSWORD}@db:5432/pharmaledger"
max_connections = 5
statement_timeout_seconds = 15
ssl_mode = "require"

[ingest]
history_limit = 200

[retention]
directories = ["data/extracted"]
retention_days = 14
keep_latest_archives = 5

[logging]
local_enabled = false
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();
    cleanup_env_vars();

    assert_eq!(config.database_target, DatabaseTarget::PostgreSQL);
    assert_eq!(config.application.log_level, "debug");
    assert!(config.application.dry_run);

    let pg = config.postgresql.as_ref().unwrap();
    assert!(pg.connection_string.expose_secret().as_str().contains("s3cret"));
    assert_eq!(pg.max_connections, 5);
    assert_eq!(pg.statement_timeout_seconds, 15);
    assert!(pg.requires_tls());

    assert_eq!(config.ingest.history_limit, 200);
    assert_eq!(config.retention.retention_days, 14);
    assert_eq!(config.retention.keep_latest_archives, 5);
    assert_eq!(config.retention.spreadsheet_extensions, vec!["xlsx", "xls"]);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_missing_substitution_variable() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
database_target = "postgresql"
[postgresql]
connection_string = "postgresql://ledger:${TEST_PL_PG_PASSWORD}@db/pharmaledger"
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_PL_PG_PASSWORD"));
}

#[test]
fn test_env_overrides_apply() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("PHARMALEDGER_INGEST_HISTORY_LIMIT", "25");
    std::env::set_var("PHARMALEDGER_APPLICATION_LOG_LEVEL", "warn");

    let file = write_config("database_target = \"memory\"\n");
    let config = load_config(file.path()).unwrap();
    cleanup_env_vars();

    assert_eq!(config.ingest.history_limit, 25);
    assert_eq!(config.application.log_level, "warn");
}

#[test]
fn test_database_url_creates_postgresql_section() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("DATABASE_URL", "postgres://u:p@localhost/ledger");
    std::env::set_var("PHARMALEDGER_DATABASE_TARGET", "postgresql");

    let file = write_config("database_target = \"memory\"\n");
    let config = load_config(file.path()).unwrap();
    cleanup_env_vars();

    assert_eq!(config.database_target, DatabaseTarget::PostgreSQL);
    let pg = config.postgresql.unwrap();
    assert_eq!(
        pg.connection_string.expose_secret().as_str(),
        "postgres://u:p@localhost/ledger"
    );
}

#[test]
fn test_invalid_override_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("PHARMALEDGER_RETENTION_RETENTION_DAYS", "0");

    let file = write_config("database_target = \"memory\"\n");
    let result = load_config(file.path());
    cleanup_env_vars();

    assert!(result.is_err());
}

#[test]
fn test_retention_window_upper_bound() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("database_target = \"memory\"\n[retention]\nretention_days = 1000000\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("retention_days"));
}

#[test]
fn test_postgresql_target_requires_section() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("database_target = \"postgresql\"\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("postgresql configuration is required"));
}

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/pharmaledger.toml").unwrap_err();
    assert!(err.to_string().contains("not found"));
}
