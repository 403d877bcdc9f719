//! Storage backends for PharmaLedger.
//!
//! - [`database`] - Store traits and the backend factory
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - In-process implementation for dry runs and tests
//!
//! # Design Pattern
//!
//! Adapters isolate the storage dependency behind [`database::LedgerStore`]
//! so the version managers never see SQL. Every entity update runs in its
//! own [`database::LedgerTransaction`].
//!
//! ```rust
//! use pharmaledger::adapters::database::LedgerStore;
//! use pharmaledger::adapters::memory::MemoryStore;
//!
//! # async fn example() -> pharmaledger::domain::Result<()> {
//! let store = MemoryStore::new();
//! store.test_connection().await?;
//! let tx = store.begin().await?;
//! tx.rollback().await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
