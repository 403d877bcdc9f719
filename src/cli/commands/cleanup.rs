//! Cleanup command implementation
//!
//! Applies the file retention policy. Ledger tables are never touched.

use crate::config::load_config;
use crate::config::schema::MAX_RETENTION_DAYS;
use crate::core::retention::{cleanup, RetentionPolicy};
use clap::Args;

/// Arguments for the cleanup command
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Override the retention window in days
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_RETENTION_DAYS)))]
    pub days: Option<u32>,
}

impl CleanupArgs {
    /// Execute the cleanup command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let mut policy = RetentionPolicy::from_config(&config.retention);
        if let Some(days) = self.days {
            tracing::info!(days = days, "Overriding retention window from CLI");
            policy = policy.with_retention_days(days);
        }

        if policy.directories.is_empty() {
            println!("No retention directories configured; nothing to clean.");
            return Ok(0);
        }

        println!("🧹 Cleaning {} director(ies)", policy.directories.len());
        println!();

        let report = tokio::task::spawn_blocking(move || cleanup(&policy)).await?;

        println!("  Files Scanned: {}", report.files_scanned);
        println!("  Spreadsheets Deleted: {}", report.spreadsheets_deleted);
        println!("  Archives Deleted: {}", report.archives_deleted);
        println!("  Archives Kept (newest): {}", report.archives_protected);
        println!("  Directories Removed: {}", report.directories_removed);
        println!("  Space Freed: {} bytes", report.bytes_freed);
        println!();

        if report.failures > 0 {
            println!(
                "⚠️  {} file operation(s) failed, see log for details",
                report.failures
            );
        } else {
            println!("✅ Cleanup completed");
        }

        Ok(0)
    }
}
