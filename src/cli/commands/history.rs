//! History command implementation
//!
//! This module implements the `history` command for listing change-log
//! entries, newest first.

use crate::adapters::database::create_ledger_store;
use crate::cli::commands::exit_code_for;
use crate::config::load_config;
use crate::core::reporting::Reporter;
use crate::domain::change::ChangeLogEntry;
use clap::Args;

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Only entries for this substance
    #[arg(long)]
    pub substance: Option<String>,

    /// Maximum number of entries (1-1000, default from config)
    #[arg(long)]
    pub limit: Option<i64>,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryArgs {
    /// Execute the history command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let limit = self.limit.unwrap_or(config.ingest.history_limit);
        tracing::info!(substance = ?self.substance, limit = limit, "Loading change history");

        let store = match create_ledger_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to database");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let reporter = Reporter::new(store.clone());
        let result = reporter
            .get_change_history(self.substance.as_deref(), Some(limit))
            .await;
        store.close().await;

        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                println!("❌ Failed to load change history");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(0);
        }

        if entries.is_empty() {
            println!("No changes recorded.");
            return Ok(0);
        }

        println!("📜 Change History ({} entries)", entries.len());
        println!();
        println!(
            "{:<20} {:<8} {:<13} {:<9} {:<30} {}",
            "Changed At", "Session", "Kind", "Change", "Substance", "Fields"
        );
        println!("{}", "-".repeat(100));

        for entry in &entries {
            println!("{}", format_row(entry));
        }

        println!();
        Ok(0)
    }
}

fn format_row(entry: &ChangeLogEntry) -> String {
    let fields = if entry.changed_fields.is_empty() {
        "-".to_string()
    } else {
        entry.changed_fields.join(", ")
    };

    format!(
        "{:<20} {:<8} {:<13} {:<9} {:<30} {}",
        entry.changed_at.format("%Y-%m-%d %H:%M:%S"),
        entry.session_id.get(),
        entry.entity_kind.as_str(),
        entry.change_type.as_str(),
        entry.substance_name,
        fields
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::{ChangeType, EntityKind};
    use crate::domain::ids::SessionId;
    use chrono::Utc;

    #[test]
    fn test_format_row_lists_fields() {
        let entry = ChangeLogEntry {
            id: 1,
            entity_kind: EntityKind::Consumer,
            substance_name: "Ибупрофен".to_string(),
            entity_key: serde_json::json!({}),
            change_type: ChangeType::Modified,
            old_payload: None,
            new_payload: serde_json::json!({}),
            changed_fields: vec!["registration_date".to_string(), "release_forms".to_string()],
            session_id: SessionId::new(7).unwrap(),
            changed_at: Utc::now(),
        };

        let row = format_row(&entry);
        assert!(row.contains("registration_date, release_forms"));
        assert!(row.contains("Ибупрофен"));
    }
}
