//! Ledger store factory
//!
//! Creates the backend selected by `database_target`.

use crate::adapters::database::traits::LedgerStore;
use crate::adapters::memory::MemoryStore;
use crate::adapters::postgresql::adapter::PostgreSQLStore;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{DatabaseTarget, PharmaLedgerConfig};
use crate::domain::{LedgerError, Result};
use std::sync::Arc;

/// Create a ledger store based on the configuration
///
/// # Errors
///
/// Returns [`LedgerError::Configuration`] if the PostgreSQL section is
/// missing or invalid, or a connection error if the pool cannot be built.
pub async fn create_ledger_store(config: &PharmaLedgerConfig) -> Result<Arc<dyn LedgerStore>> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                LedgerError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL ledger store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            Ok(Arc::new(PostgreSQLStore::new(client)))
        }
        DatabaseTarget::Memory => {
            tracing::info!("Creating in-memory ledger store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_target() {
        let store = create_ledger_store(&PharmaLedgerConfig::in_memory())
            .await
            .unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert!(store.test_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_postgresql_target_without_section() {
        let mut config = PharmaLedgerConfig::in_memory();
        config.database_target = DatabaseTarget::PostgreSQL;
        let result = create_ledger_store(&config).await;
        assert!(matches!(result, Err(LedgerError::Configuration(_))));
    }
}
