//! Integration tests for batch ingestion
//!
//! These tests verify that:
//! - A batch file flows through validation, session creation and reconciliation
//! - Replaying the same batch changes nothing
//! - Reporting queries see sessions and changes in order
//! - A shutdown signal stops scheduling new records

use pharmaledger::adapters::database::{create_ledger_store, LedgerStore};
use pharmaledger::adapters::memory::MemoryStore;
use pharmaledger::config::PharmaLedgerConfig;
use pharmaledger::core::ingest::IngestCoordinator;
use pharmaledger::core::reporting::Reporter;
use pharmaledger::domain::{AnalysisBatch, ChangeType, EntityKind, ErrorKind};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::watch;

fn batch_json(manufacturers: &str, registration_date: &str) -> String {
    format!(
        r#"{{
        "timestamp": "2024-05-01T09:00:00",
        "source_file": "data/extracted/Действующий реестр.xlsx",
        "statistics": {{"total_records": 4, "substances_found": 2,
                        "preparations_found": 2, "substance_consumers_found": 2}},
        "substances_manufacturers": [
            {{"substance_name": "Ибупрофен", "manufacturers": {manufacturers}}},
            {{"substance_name": "Парацетамол", "manufacturers": ["Фармстандарт"]}}
        ],
        "substance_consumers": [
            {{"substance_name": "Ибупрофен", "preparation_trade_name": "Нурофен",
             "preparation_manufacturer": "Reckitt", "registration_number": "П N011470/01",
             "preparation_inn_name": "Ибупрофен", "preparation_country": "Великобритания",
             "registration_date": "{registration_date}", "release_forms": null}},
            {{"substance_name": "Парацетамол", "preparation_trade_name": "Панадол",
             "preparation_manufacturer": "GSK", "registration_number": "П N015371/01",
             "preparation_inn_name": 500, "preparation_country": "Ирландия",
             "registration_date": 20100101, "release_forms": "таблетки"}}
        ]
    }}"#
    )
}

fn ingest_setup() -> (Arc<MemoryStore>, IngestCoordinator, watch::Sender<bool>) {
    let store = Arc::new(MemoryStore::new());
    let (tx, rx) = watch::channel(false);
    let coordinator = IngestCoordinator::new(store.clone(), rx);
    (store, coordinator, tx)
}

#[tokio::test]
async fn test_batch_file_ingest() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(batch_json(r#"["A", "B"]"#, "2010-01-01").as_bytes())
        .unwrap();

    let batch = AnalysisBatch::from_path(file.path()).unwrap();
    let (store, coordinator, _tx) = ingest_setup();

    let summary = coordinator.ingest(&batch).await.unwrap();

    assert_eq!(summary.changed_count, 4);
    assert_eq!(summary.manufacturers.changed, 2);
    assert_eq!(summary.consumers.changed, 2);
    assert!(summary.is_complete());

    let reporter = Reporter::new(store.clone());
    let session = reporter.get_latest_session().await.unwrap().unwrap();
    assert_eq!(session.id, summary.session_id);
    assert_eq!(session.total_records, 4);
    assert_eq!(session.consumers_found, 2);

    let history = reporter.get_change_history(None, None).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|e| e.change_type == ChangeType::Added));
}

#[tokio::test]
async fn test_replay_produces_no_changes() {
    let batch = AnalysisBatch::from_json_str(&batch_json(r#"["A", "B"]"#, "2010-01-01")).unwrap();
    let (store, coordinator, _tx) = ingest_setup();

    let first = coordinator.ingest(&batch).await.unwrap();
    let changes_after_first = store.change_count().await;

    let second = coordinator.ingest(&batch).await.unwrap();

    assert_eq!(second.changed_count, 0);
    assert_eq!(second.manufacturers.unchanged, 2);
    assert_eq!(second.consumers.unchanged, 2);
    assert_eq!(store.change_count().await, changes_after_first);
    assert_eq!(store.session_count().await, 2);
    assert!(second.session_id > first.session_id);
}

#[tokio::test]
async fn test_second_batch_logs_modifications() {
    let (store, coordinator, _tx) = ingest_setup();

    let first = AnalysisBatch::from_json_str(&batch_json(r#"["A", "B"]"#, "2010-01-01")).unwrap();
    coordinator.ingest(&first).await.unwrap();

    let second = AnalysisBatch::from_json_str(&batch_json(r#"["B", "C"]"#, "2012-12-12")).unwrap();
    let summary = coordinator.ingest(&second).await.unwrap();
    assert_eq!(summary.changed_count, 2);

    let reporter = Reporter::new(store.clone());
    let history = reporter
        .get_change_history(Some("Ибупрофен"), Some(10))
        .await
        .unwrap();
    assert_eq!(history.len(), 4);

    let modified: Vec<_> = history
        .iter()
        .filter(|e| e.change_type == ChangeType::Modified)
        .collect();
    assert_eq!(modified.len(), 2);
    assert!(modified.iter().all(|e| e.session_id == summary.session_id));

    let consumer_change = modified
        .iter()
        .find(|e| e.entity_kind == EntityKind::Consumer)
        .unwrap();
    assert_eq!(consumer_change.changed_fields, vec!["registration_date"]);

    let limited = reporter.get_change_history(None, Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, history.iter().map(|e| e.id).max().unwrap());
}

#[tokio::test]
async fn test_shutdown_mid_batch_keeps_committed_records() {
    let batch = AnalysisBatch::from_json_str(&batch_json(r#"["A"]"#, "2010-01-01")).unwrap();
    let (store, coordinator, tx) = ingest_setup();

    tx.send(true).unwrap();
    let summary = coordinator.ingest(&batch).await.unwrap();

    assert!(summary.interrupted);
    assert!(!summary.is_complete());
    assert_eq!(summary.total_processed(), 0);
    assert_eq!(store.session_count().await, 1);
}

#[tokio::test]
async fn test_memory_target_from_config() {
    let store = create_ledger_store(&PharmaLedgerConfig::in_memory())
        .await
        .unwrap();
    assert_eq!(store.backend_name(), "memory");

    let (_tx, rx) = watch::channel(false);
    let coordinator = IngestCoordinator::new(store.clone(), rx);
    let batch = AnalysisBatch::from_json_str(&batch_json("[]", "2010-01-01")).unwrap();
    let summary = coordinator.ingest(&batch).await.unwrap();

    assert_eq!(summary.changed_count, 4);
    assert!(store.latest_session().await.unwrap().is_some());
}

#[test]
fn test_malformed_batch_rejected_before_store() {
    let input = batch_json(r#"["A", 7, null]"#, "2010-01-01");
    let err = AnalysisBatch::from_json_str(&input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("substances_manufacturers[0].manufacturers[2]"));
}

#[test]
fn test_loose_values_normalized() {
    let batch = AnalysisBatch::from_json_str(&batch_json("[]", "2010-01-01")).unwrap();
    let panadol = &batch.consumers[1].attributes;
    assert_eq!(panadol.preparation_inn_name, "500");
    assert_eq!(panadol.registration_date, "20100101");
    assert_eq!(batch.consumers[0].attributes.release_forms, "");
}
