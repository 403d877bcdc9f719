//! Status command implementation
//!
//! This module implements the `status` command for displaying the latest
//! analysis session.

use crate::adapters::database::create_ledger_store;
use crate::cli::commands::exit_code_for;
use crate::config::load_config;
use crate::core::reporting::Reporter;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the session as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking ledger status");

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

        let reporter = Reporter::new(store.clone());
        let latest = reporter.get_latest_session().await;
        store.close().await;

        let session = match latest {
            Ok(Some(s)) => s,
            Ok(None) => {
                println!("No analysis sessions found.");
                println!("Run 'pharmaledger ingest <BATCH.json>' to record one.");
                return Ok(0);
            }
            Err(e) => {
                println!("❌ Failed to load latest session");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&session)?);
            return Ok(0);
        }

        println!("📊 Latest Analysis Session");
        println!();
        println!("  Session ID: {}", session.id);
        println!("  Source File: {}", session.source_file);
        println!(
            "  Extracted At: {}",
            session.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        println!(
            "  Recorded At: {}",
            session.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!("  Total Records: {}", session.total_records);
        println!("  Substances: {}", session.substances_found);
        println!("  Preparations: {}", session.preparations_found);
        println!("  Substance Consumers: {}", session.consumers_found);
        println!();
        Ok(0)
    }
}
