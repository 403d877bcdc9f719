//! Database abstraction layer
//!
//! This module provides the trait-based store abstraction, allowing
//! PharmaLedger to work with PostgreSQL or the in-memory backend.

pub mod factory;
pub mod traits;

pub use factory::create_ledger_store;
pub use traits::{LedgerStore, LedgerTransaction};
