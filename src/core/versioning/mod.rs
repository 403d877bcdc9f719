//! Versioned entity reconciliation
//!
//! Each manufacturer or consumer record is one unit of work: a transaction
//! that looks up the current version, then either refreshes last-seen,
//! retires it and inserts the next version, or inserts version 1. The
//! change-log entry is written in the same transaction.
//!
//! - [`manufacturer`] - substance to manufacturer-set associations
//! - [`consumer`] - substance-consuming preparations
//! - [`changelog`] - audit entry construction and append
//! - [`scope`] - commit/rollback of a unit transaction

pub mod changelog;
pub mod consumer;
pub mod manufacturer;
pub mod scope;

pub use changelog::ChangeLogWriter;
pub use consumer::ConsumerVersionManager;
pub use manufacturer::ManufacturerVersionManager;
