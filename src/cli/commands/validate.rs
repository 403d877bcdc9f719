//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the PharmaLedger configuration file.

use crate::config::load_config;
use crate::config::redact_connection_string;
use crate::config::schema::DatabaseTarget;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// [`load_config`] validates as it loads, so a load failure covers both
    /// syntax and value errors.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Database Target: {}", config.database_target.as_str());

        if config.database_target == DatabaseTarget::PostgreSQL {
            if let Some(ref pg_config) = config.postgresql {
                println!(
                    "  PostgreSQL Connection: {}",
                    redact_connection_string(pg_config.connection_string.expose_secret().as_str())
                );
                println!("  Max Connections: {}", pg_config.max_connections);
                println!("  SSL Mode: {}", pg_config.ssl_mode);
            }
        }

        println!("  History Limit: {}", config.ingest.history_limit);
        println!(
            "  Retention: {} ({} days, keep {} newest archives)",
            if config.retention.enabled { "enabled" } else { "disabled" },
            config.retention.retention_days,
            config.retention.keep_latest_archives
        );
        println!("  Retention Directories: {:?}", config.retention.directories);
        println!(
            "  File Logging: {}",
            if config.logging.local_enabled {
                config.logging.local_path.as_str()
            } else {
                "disabled"
            }
        );
        println!();
        Ok(0)
    }
}
