//! PostgreSQL ledger backend
//!
//! Stores sessions, versioned records and the change log in four tables
//! created by `migrations/001_initial_schema.sql`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::{PostgreSQLStore, PostgreSQLTransaction};
pub use client::PostgreSQLClient;
