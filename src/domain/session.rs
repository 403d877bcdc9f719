//! Analysis session model
//!
//! One session is written per ingested batch, before any entity work, and
//! never changes afterwards.

use crate::domain::ids::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate counts reported by the extraction step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total_records: i64,
    pub substances_found: i64,
    pub preparations_found: i64,
    pub substance_consumers_found: i64,
}

/// Batch metadata needed to open a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// When the source was extracted
    pub timestamp: DateTime<Utc>,

    /// Source file the batch was extracted from
    pub source_file: String,

    pub statistics: BatchStatistics,
}

/// Stored analysis session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub source_file: String,
    pub total_records: i64,
    pub substances_found: i64,
    pub preparations_found: i64,
    pub consumers_found: i64,
    pub created_at: DateTime<Utc>,
}

impl AnalysisSession {
    /// Builds the stored form from metadata and the assigned id
    pub fn from_metadata(id: SessionId, meta: &SessionMetadata, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            timestamp: meta.timestamp,
            source_file: meta.source_file.clone(),
            total_records: meta.statistics.total_records,
            substances_found: meta.statistics.substances_found,
            preparations_found: meta.statistics.preparations_found,
            consumers_found: meta.statistics.substance_consumers_found,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_metadata() {
        let now = Utc::now();
        let meta = SessionMetadata {
            timestamp: now,
            source_file: "grls.xlsx".to_string(),
            statistics: BatchStatistics {
                total_records: 100,
                substances_found: 10,
                preparations_found: 90,
                substance_consumers_found: 50,
            },
        };

        let session = AnalysisSession::from_metadata(SessionId::new(3).unwrap(), &meta, now);
        assert_eq!(session.id.get(), 3);
        assert_eq!(session.source_file, "grls.xlsx");
        assert_eq!(session.consumers_found, 50);
        assert_eq!(session.total_records, 100);
    }
}
