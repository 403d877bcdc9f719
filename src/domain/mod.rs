//! Domain models and types for PharmaLedger.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`SessionId`], [`SubstanceName`], [`ConsumerKey`])
//! - **Versioned records** ([`ManufacturerVersion`], [`ConsumerVersion`])
//! - **Audit records** ([`AnalysisSession`], [`ChangeLogEntry`])
//! - **Batch validation** ([`AnalysisBatch`])
//! - **Error types** ([`LedgerError`], [`ErrorKind`]) and the [`Result`] alias
//!
//! # Batch Validation
//!
//! Raw extraction output is converted into typed records up front:
//!
//! ```rust
//! use pharmaledger::domain::AnalysisBatch;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let batch = AnalysisBatch::from_json_str(r#"{
//!     "timestamp": "2024-05-01T09:00:00",
//!     "source_file": "registry.xlsx",
//!     "statistics": {"total_records": 1, "substances_found": 1,
//!                    "preparations_found": 0, "substance_consumers_found": 0},
//!     "substances_manufacturers": [{"substance_name": "Ибупрофен", "manufacturers": ["A"]}],
//!     "substance_consumers": []
//! }"#)?;
//! assert_eq!(batch.manufacturers.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod change;
pub mod errors;
pub mod ids;
pub mod records;
pub mod result;
pub mod session;

// Re-export commonly used types for convenience
pub use batch::{AnalysisBatch, RawAnalysisBatch};
pub use change::{ChangeLogEntry, ChangeType, EntityKind, NewChangeLogEntry};
pub use errors::{ErrorKind, LedgerError};
pub use ids::{ConsumerKey, SessionId, SubstanceName};
pub use records::{
    ConsumerAttributes, ConsumerRecord, ConsumerVersion, ManufacturerRecord, ManufacturerSet,
    ManufacturerVersion, NewConsumerVersion, NewManufacturerVersion,
};
pub use result::Result;
pub use session::{AnalysisSession, BatchStatistics, SessionMetadata};
