//! Out-of-band retention for extracted spreadsheets and downloaded archives

pub mod cleanup;

pub use cleanup::{cleanup, cleanup_at, CleanupReport, RetentionPolicy};
