//! Scoped transaction completion
//!
//! Every entity update follows the same shape:
//!
//! ```rust
//! use pharmaledger::adapters::database::LedgerStore;
//! use pharmaledger::adapters::memory::MemoryStore;
//! use pharmaledger::core::versioning::scope;
//!
//! # async fn example() -> pharmaledger::domain::Result<()> {
//! let store = MemoryStore::new();
//! let tx = store.begin().await?;
//! let outcome = async { Ok::<_, pharmaledger::domain::LedgerError>(42) }.await;
//! let value = scope::finish(tx, outcome).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use crate::adapters::database::LedgerTransaction;
use crate::domain::Result;

/// Commit on `Ok`, roll back on `Err`
///
/// A failed rollback is logged and the original error is returned. If the
/// commit itself fails, that error is returned and nothing is kept.
pub async fn finish<T>(tx: Box<dyn LedgerTransaction>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(
                    error = %rollback_err,
                    cause = %err,
                    "Rollback failed, connection discarded"
                );
            }
            Err(err)
        }
    }
}
