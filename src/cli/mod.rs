//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for PharmaLedger using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// PharmaLedger - versioned registry of substance manufacturers and consumers
#[derive(Parser, Debug)]
#[command(name = "pharmaledger")]
#[command(version, about, long_about = None)]
#[command(author = "PharmaLedger Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "pharmaledger.toml",
        env = "PHARMALEDGER_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PHARMALEDGER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest an analysis batch into the ledger
    Ingest(commands::ingest::IngestArgs),

    /// Show the latest analysis session
    Status(commands::status::StatusArgs),

    /// Show recent change-log entries
    History(commands::history::HistoryArgs),

    /// Delete expired spreadsheets and archives
    Cleanup(commands::cleanup::CleanupArgs),

    /// Create ledger tables and indexes
    Migrate(commands::migrate::MigrateArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_ingest() {
        let cli = Cli::parse_from(["pharmaledger", "ingest", "batch.json"]);
        assert_eq!(cli.config, "pharmaledger.toml");
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.batch, "batch.json");
                assert!(!args.dry_run);
                assert!(!args.strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_ingest_flags() {
        let cli = Cli::parse_from(["pharmaledger", "ingest", "b.json", "--dry-run", "--strict"]);
        match cli.command {
            Commands::Ingest(args) => assert!(args.dry_run && args.strict),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_ingest_requires_batch() {
        assert!(Cli::try_parse_from(["pharmaledger", "ingest"]).is_err());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["pharmaledger", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["pharmaledger", "--log-level", "debug", "status"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_history() {
        let cli = Cli::parse_from([
            "pharmaledger",
            "history",
            "--substance",
            "Ибупрофен",
            "--limit",
            "10",
        ]);
        match cli.command {
            Commands::History(args) => {
                assert_eq!(args.substance.as_deref(), Some("Ибупрофен"));
                assert_eq!(args.limit, Some(10));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_cleanup_days() {
        let cli = Cli::parse_from(["pharmaledger", "cleanup", "--days", "7"]);
        assert!(matches!(cli.command, Commands::Cleanup(ref a) if a.days == Some(7)));
    }

    #[test]
    fn test_cli_parse_simple_commands() {
        let cli = Cli::parse_from(["pharmaledger", "migrate"]);
        assert!(matches!(cli.command, Commands::Migrate(_)));
        let cli = Cli::parse_from(["pharmaledger", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
        let cli = Cli::parse_from(["pharmaledger", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
