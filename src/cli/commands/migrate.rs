//! Migrate command implementation
//!
//! Creates the ledger tables and indexes when they are missing.

use crate::adapters::database::create_ledger_store;
use crate::cli::commands::exit_code_for;
use crate::config::load_config;
use clap::Args;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let store = match create_ledger_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        tracing::info!(backend = store.backend_name(), "Applying ledger schema");
        let result = store.ensure_schema().await;
        store.close().await;

        match result {
            Ok(()) => {
                println!("✅ Schema is up to date ({})", store.backend_name());
                Ok(0)
            }
            Err(e) => {
                println!("❌ Schema migration failed");
                println!("   Error: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
