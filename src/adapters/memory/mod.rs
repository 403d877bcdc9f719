//! In-memory ledger backend
//!
//! Used for dry runs (reconcile a batch against an empty ledger without a
//! database) and by the test-suite.

pub mod store;

pub use store::MemoryStore;
